//! Object graphs shared by the integration tests.
#![allow(dead_code)]

use std::rc::Rc;

use pathbind_core::{
    Bindable, DynObject, MemberDescriptor, Notify, ObjectRef, TypeDescriptor, Value, ValueType,
};

static DATA_A_MEMBERS: [MemberDescriptor; 4] = [
    MemberDescriptor::property("PropA", ValueType::Int),
    MemberDescriptor::property("PropB", ValueType::Object(&DATA_B)),
    MemberDescriptor::property("B", ValueType::Object(&DATA_B)),
    MemberDescriptor::property("Custom", ValueType::Object(&CUSTOM)),
];
pub static DATA_A: TypeDescriptor = TypeDescriptor::new("DataA", &DATA_A_MEMBERS);

static DATA_B_MEMBERS: [MemberDescriptor; 2] = [
    MemberDescriptor::property("PropB", ValueType::Int),
    MemberDescriptor::property("PropC", ValueType::Int),
];
pub static DATA_B: TypeDescriptor = TypeDescriptor::new("DataB", &DATA_B_MEMBERS);

static TEXT_MEMBERS: [MemberDescriptor; 1] = [MemberDescriptor::property("Text", ValueType::Text)];
pub static TEXT_DATA: TypeDescriptor = TypeDescriptor::new("TextData", &TEXT_MEMBERS);

static CUSTOM_MEMBERS: [MemberDescriptor; 1] =
    [MemberDescriptor::property("PropD", ValueType::Int)];
pub static CUSTOM: TypeDescriptor = TypeDescriptor::new("CustomData", &CUSTOM_MEMBERS);

pub fn data_a(prop_a: i64) -> Rc<DynObject> {
    DynObject::new(&DATA_A, Notify::MemberEvents)
        .with("PropA", prop_a)
        .shared()
}

pub fn data_a_with_b(prop_a: i64, b: &Rc<DynObject>) -> Rc<DynObject> {
    DynObject::new(&DATA_A, Notify::MemberEvents)
        .with("PropA", prop_a)
        .with("B", Value::Object(b.clone()))
        .shared()
}

pub fn data_b(prop_b: i64, prop_c: i64) -> Rc<DynObject> {
    DynObject::new(&DATA_B, Notify::MemberEvents)
        .with("PropB", prop_b)
        .with("PropC", prop_c)
        .shared()
}

pub fn text_data(text: &str) -> Rc<DynObject> {
    DynObject::new(&TEXT_DATA, Notify::PropertyChanged)
        .with("Text", text)
        .shared()
}

pub fn custom(prop_d: i64) -> ObjectRef {
    DynObject::new(&CUSTOM, Notify::Silent)
        .with("PropD", prop_d)
        .shared()
}

pub fn int(obj: &DynObject, member: &str) -> i64 {
    match obj.get(member) {
        Ok(Value::Int(v)) => v,
        other => panic!("{member} is not an Int: {other:?}"),
    }
}

/// `obj.<member>.<inner>` as an Int.
pub fn nested_int(obj: &DynObject, member: &str, inner: &str) -> i64 {
    match obj.get(member) {
        Ok(Value::Object(o)) => match o.get_property(inner) {
            Ok(Value::Int(v)) => v,
            other => panic!("{member}.{inner} is not an Int: {other:?}"),
        },
        other => panic!("{member} is not an object: {other:?}"),
    }
}

/// Route `tracing` output through the test harness when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
