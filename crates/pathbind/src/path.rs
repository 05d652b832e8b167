//! Path descriptions and their resolution against a root type.
//!
//! A [`PathExpr`] is the declarative description of a member-access chain.
//! It can be built with the [`path!`](crate::path!) macro, with
//! [`PathExpr::member`], or parsed from text:
//!
//! | Text | Expression |
//! |------|------------|
//! | `""` | root |
//! | `B.PropB` | member chain |
//! | `Items[0]` | index (unsupported) |
//! | `Total()` | call (unsupported) |
//! | `Config::Default` | static member (unsupported) |
//!
//! Only root and member steps resolve. Resolution happens once, when a
//! binding node is built, and either yields the complete chain or fails.

use std::fmt;

use pathbind_core::{BindError, MemberDescriptor, Result, TypeDescriptor, ValueType};

/// Declarative member-access expression rooted at the bound object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathExpr {
    /// The root object itself.
    Root,
    /// `target.name`
    Member { target: Box<PathExpr>, name: String },
    /// `target[index]`
    Index { target: Box<PathExpr>, index: String },
    /// `target.method()`
    Call { target: Box<PathExpr>, method: String },
    /// `Type::member`
    Static { type_name: String, member: String },
}

impl PathExpr {
    #[must_use]
    pub fn root() -> Self {
        Self::Root
    }

    /// Append a member access step.
    #[must_use]
    pub fn member(self, name: impl Into<String>) -> Self {
        Self::Member {
            target: Box::new(self),
            name: name.into(),
        }
    }

    /// Parse the textual form described in the module docs.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::Root);
        }
        if let Some((type_name, member)) = text.split_once("::") {
            if is_ident(type_name) && is_ident(member) {
                return Ok(Self::Static {
                    type_name: type_name.to_owned(),
                    member: member.to_owned(),
                });
            }
            return Err(not_supported(text, "malformed static member access"));
        }

        let mut expr = Self::Root;
        for segment in text.split('.') {
            expr = parse_segment(expr, segment, text)?;
        }
        Ok(expr)
    }

    /// Member names from the root outwards; `None` if the path has a
    /// non-member step.
    #[must_use]
    pub fn member_names(&self) -> Option<Vec<&str>> {
        match self {
            Self::Root => Some(Vec::new()),
            Self::Member { target, name } => {
                let mut names = target.member_names()?;
                names.push(name);
                Some(names)
            }
            _ => None,
        }
    }
}

fn parse_segment(target: PathExpr, segment: &str, whole: &str) -> Result<PathExpr> {
    if let Some(inner) = segment.strip_suffix(']') {
        let (name, index) = inner
            .split_once('[')
            .ok_or_else(|| not_supported(whole, "unbalanced brackets"))?;
        let target = if name.is_empty() {
            target
        } else {
            parse_segment(target, name, whole)?
        };
        return Ok(PathExpr::Index {
            target: Box::new(target),
            index: index.to_owned(),
        });
    }
    if let Some(method) = segment.strip_suffix("()") {
        if is_ident(method) {
            return Ok(PathExpr::Call {
                target: Box::new(target),
                method: method.to_owned(),
            });
        }
    }
    if is_ident(segment) {
        return Ok(target.member(segment));
    }
    Err(not_supported(
        whole,
        format!("`{segment}` is not a member access"),
    ))
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn not_supported(path: impl fmt::Display, reason: impl Into<String>) -> BindError {
    BindError::PathNotSupported {
        path: path.to_string(),
        reason: reason.into(),
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => Ok(()),
            Self::Member { target, name } => {
                if **target == Self::Root {
                    f.write_str(name)
                } else {
                    write!(f, "{target}.{name}")
                }
            }
            Self::Index { target, index } => write!(f, "{target}[{index}]"),
            Self::Call { target, method } => {
                if **target == Self::Root {
                    write!(f, "{method}()")
                } else {
                    write!(f, "{target}.{method}()")
                }
            }
            Self::Static { type_name, member } => write!(f, "{type_name}::{member}"),
        }
    }
}

impl std::str::FromStr for PathExpr {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Build a member-access [`PathExpr`] from identifiers.
///
/// ```
/// use pathbind::{path, PathExpr};
///
/// assert_eq!(path!(), PathExpr::Root);
/// assert_eq!(path!(B.PropB), PathExpr::root().member("B").member("PropB"));
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::PathExpr::Root
    };
    ($($seg:ident).+) => {
        $crate::PathExpr::Root$(.member(stringify!($seg)))+
    };
}

/// A path checked against a root type.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedPath {
    pub(crate) root: &'static TypeDescriptor,
    pub(crate) steps: Vec<&'static MemberDescriptor>,
    pub(crate) text: String,
}

impl ResolvedPath {
    /// Declared type of the path's endpoint.
    pub(crate) fn value_type(&self) -> ValueType {
        self.steps
            .last()
            .map_or(ValueType::Object(self.root), |m| m.value_type)
    }
}

/// Resolve `expr` against `root`, failing fast on any unsupported step.
pub(crate) fn resolve(expr: &PathExpr, root: &'static TypeDescriptor) -> Result<ResolvedPath> {
    let mut steps = Vec::new();
    resolve_into(expr, root, expr, &mut steps)?;
    Ok(ResolvedPath {
        root,
        steps,
        text: expr.to_string(),
    })
}

fn resolve_into(
    expr: &PathExpr,
    root: &'static TypeDescriptor,
    whole: &PathExpr,
    steps: &mut Vec<&'static MemberDescriptor>,
) -> Result<ValueType> {
    match expr {
        PathExpr::Root => Ok(ValueType::Object(root)),
        PathExpr::Member { target, name } => {
            let owner = resolve_into(target, root, whole, steps)?;
            let desc = owner.object_descriptor().ok_or_else(|| {
                not_supported(whole, format!("`{name}` is accessed on a {owner} value"))
            })?;
            let member = desc.member(name).ok_or_else(|| BindError::UnknownMember {
                type_name: desc.name.to_owned(),
                member: name.clone(),
            })?;
            steps.push(member);
            Ok(member.value_type)
        }
        PathExpr::Index { .. } => Err(not_supported(whole, "indexers cannot be bound")),
        PathExpr::Call { .. } => Err(not_supported(whole, "method calls cannot be bound")),
        PathExpr::Static { .. } => Err(not_supported(whole, "static members cannot be bound")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathbind_core::MemberKind;

    static INNER_MEMBERS: [MemberDescriptor; 2] = [
        MemberDescriptor::property("Count", ValueType::Int),
        MemberDescriptor::field("Raw", ValueType::Float),
    ];
    static INNER: TypeDescriptor = TypeDescriptor::new("Inner", &INNER_MEMBERS);

    static OUTER_MEMBERS: [MemberDescriptor; 2] = [
        MemberDescriptor::property("Inner", ValueType::Object(&INNER)),
        MemberDescriptor::property("Name", ValueType::Text),
    ];
    static OUTER: TypeDescriptor = TypeDescriptor::new("Outer", &OUTER_MEMBERS);

    #[test]
    fn parse_member_chain() {
        let expr = PathExpr::parse("Inner.Count").unwrap();
        assert_eq!(expr, path!(Inner.Count));
        assert_eq!(expr.to_string(), "Inner.Count");
        assert_eq!(expr.member_names(), Some(vec!["Inner", "Count"]));
    }

    #[test]
    fn parse_unsupported_shapes() {
        assert!(matches!(
            PathExpr::parse("Items[0]"),
            Ok(PathExpr::Index { .. })
        ));
        assert!(matches!(PathExpr::parse("Total()"), Ok(PathExpr::Call { .. })));
        assert!(matches!(
            PathExpr::parse("Config::Default"),
            Ok(PathExpr::Static { .. })
        ));
        assert!(PathExpr::parse("a + b").is_err());
        assert!(PathExpr::parse("A..B").is_err());
        assert!(PathExpr::parse("1st").is_err());
    }

    #[test]
    fn display_round_trips() {
        for text in ["", "Name", "Inner.Count", "Items[0]", "Inner.Total()", "T::M"] {
            assert_eq!(PathExpr::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn resolve_nested_member() {
        let resolved = resolve(&path!(Inner.Raw), &OUTER).unwrap();
        assert_eq!(resolved.steps.len(), 2);
        assert_eq!(resolved.steps[1].kind, MemberKind::Field);
        assert_eq!(resolved.value_type(), ValueType::Float);
    }

    #[test]
    fn resolve_root_is_object_type() {
        let resolved = resolve(&path!(), &OUTER).unwrap();
        assert!(resolved.steps.is_empty());
        assert_eq!(resolved.value_type(), ValueType::Object(&OUTER));
    }

    #[test]
    fn resolve_rejects_everything_else() {
        let index = PathExpr::parse("Inner[0]").unwrap();
        assert!(matches!(
            resolve(&index, &OUTER),
            Err(BindError::PathNotSupported { .. })
        ));
        let call = PathExpr::parse("Inner.Count()").unwrap();
        assert!(matches!(
            resolve(&call, &OUTER),
            Err(BindError::PathNotSupported { .. })
        ));
        assert!(matches!(
            resolve(&path!(Name.Length), &OUTER),
            Err(BindError::PathNotSupported { .. })
        ));
        assert!(matches!(
            resolve(&path!(Missing), &OUTER),
            Err(BindError::UnknownMember { .. })
        ));
    }
}
