//! Resolution of dotted filter keys such as `projs.issues.title` or
//! `deliverable(Parcel).parcelTitle` against the schema.

use crate::error::CompileError;
use model::schema::{EntitySchema, SchemaError, SchemaRegistry};
use std::fmt;

/// One dotted component of a key, with its optional polymorphic tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub tag: Option<String>,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}({tag})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainResolution {
    /// The key addresses a root property (possibly into its JSON value).
    Plain,
    /// The key stops at a relation.
    Relations(Vec<PathSegment>),
    /// A relation chain followed by a property path on its final target.
    Property {
        chain: Vec<PathSegment>,
        /// First segment after the chain, e.g. `address`.
        property: String,
        /// Whole trailing path, e.g. `address.city`.
        property_key: String,
    },
}

/// Splits `key` on `.` and parses each `name(Tag)` segment.
pub fn parse_key(key: &str) -> Result<Vec<PathSegment>, CompileError> {
    key.split('.').map(|part| parse_segment(key, part)).collect()
}

fn parse_segment(key: &str, part: &str) -> Result<PathSegment, CompileError> {
    let malformed = || CompileError::MalformedKey(key.to_string());

    match (part.find('('), part.rfind(')')) {
        (None, None) if !part.is_empty() => Ok(PathSegment {
            name: part.to_string(),
            tag: None,
        }),
        (Some(open), Some(close)) if open > 0 && close == part.len() - 1 && close > open + 1 => {
            let tag = &part[open + 1..close];
            if tag.contains('(') || tag.contains(')') {
                return Err(malformed());
            }
            Ok(PathSegment {
                name: part[..open].to_string(),
                tag: Some(tag.to_string()),
            })
        }
        _ => Err(malformed()),
    }
}

/// Walks the relation map of `root` along `key`.
///
/// Unknown root keys are fatal here; callers decide beforehand which keys
/// are worth resolving at all.
pub fn resolve_chain(
    registry: &SchemaRegistry,
    root: &EntitySchema,
    key: &str,
) -> Result<ChainResolution, CompileError> {
    let segments = parse_key(key)?;

    let mut current = root;
    let mut matched = 0;
    let mut polymorphic = false;

    for segment in &segments {
        let Some(relation) = current.relation(&segment.name) else {
            break;
        };

        if matched > 0 && segments[matched - 1].tag.is_some() {
            return Err(CompileError::InvalidPolymorphicUsage {
                key: key.to_string(),
                reason: format!(
                    "tag on '{}' must be on the last relation of the chain",
                    segments[matched - 1].name
                ),
            });
        }
        if segment.tag.is_some() && !relation.is_polymorphic() {
            return Err(CompileError::InvalidPolymorphicUsage {
                key: key.to_string(),
                reason: format!("relation '{}' is not polymorphic", segment.name),
            });
        }

        let target = segment.tag.as_deref().unwrap_or(relation.target());
        current = registry
            .entity(target)
            .map_err(|_| SchemaError::UnregisteredTarget {
                entity: current.name.clone(),
                relation: segment.name.clone(),
                target: target.to_string(),
            })?;
        polymorphic = relation.is_polymorphic();
        matched += 1;
    }

    let (chain, rest) = segments.split_at(matched);

    if let Some(tagged) = rest.iter().find(|s| s.tag.is_some()) {
        return Err(CompileError::InvalidPolymorphicUsage {
            key: key.to_string(),
            reason: format!("'{}' is a property and cannot carry a tag", tagged.name),
        });
    }

    let Some(first) = rest.first() else {
        return Ok(ChainResolution::Relations(chain.to_vec()));
    };

    if chain.is_empty() {
        if root.has_property(&first.name) {
            return Ok(ChainResolution::Plain);
        }
        return Err(CompileError::UnknownPath {
            entity: root.name.clone(),
            key: key.to_string(),
        });
    }

    // A polymorphic target may be an ancestor without the property.
    if !polymorphic && !current.has_property(&first.name) {
        return Err(CompileError::PropertyNotOnTarget {
            property: first.name.clone(),
            entity: current.name.clone(),
            chain: chain
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join("."),
        });
    }

    Ok(ChainResolution::Property {
        chain: chain.to_vec(),
        property: first.name.clone(),
        property_key: rest
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join("."),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::schema::{KeyedRelation, PropertyType, RelationDescriptor};

    fn registry() -> SchemaRegistry {
        let org = EntitySchema::new("Org")
            .with_id("id", PropertyType::Number)
            .with_property("name", PropertyType::String)
            .with_relation(
                "projs",
                RelationDescriptor::HasMany(KeyedRelation::new("Proj").key_to("org_id")),
            );
        let proj = EntitySchema::new("Proj")
            .with_id("id", PropertyType::Number)
            .with_property("title", PropertyType::String)
            .with_property("meta", PropertyType::Object)
            .with_relation(
                "org",
                RelationDescriptor::BelongsTo(KeyedRelation::new("Org").key_from("org_id")),
            );
        let transport = EntitySchema::new("Transport")
            .with_id("id", PropertyType::Number)
            .with_relation(
                "deliverable",
                RelationDescriptor::BelongsTo(KeyedRelation::new("Deliverable").polymorphic(None)),
            );
        let deliverable = EntitySchema::new("Deliverable").with_id("id", PropertyType::Number);
        let parcel = EntitySchema::new("Parcel")
            .with_id("id", PropertyType::Number)
            .with_property("parcelTitle", PropertyType::String);

        SchemaRegistry::new()
            .with(org)
            .and_then(|r| r.with(proj))
            .and_then(|r| r.with(transport))
            .and_then(|r| r.with(deliverable))
            .and_then(|r| r.with(parcel))
            .unwrap()
    }

    fn segment(name: &str, tag: Option<&str>) -> PathSegment {
        PathSegment {
            name: name.into(),
            tag: tag.map(String::from),
        }
    }

    #[test]
    fn test_parse_key_segments() {
        assert_eq!(
            parse_key("deliverable(Parcel).parcelTitle").unwrap(),
            vec![segment("deliverable", Some("Parcel")), segment("parcelTitle", None)]
        );
        assert_eq!(parse_key("a").unwrap(), vec![segment("a", None)]);
    }

    #[test]
    fn test_parse_key_rejects_malformed_parentheses() {
        for key in ["a(b", "a)b", "a()", "(b).c", "a..b", "a(b)c", "a((b))"] {
            assert!(
                matches!(parse_key(key), Err(CompileError::MalformedKey(_))),
                "{key} should be malformed"
            );
        }
    }

    #[test]
    fn test_resolve_plain_property() {
        let registry = registry();
        let org = registry.entity("Org").unwrap();
        assert_eq!(resolve_chain(&registry, org, "name").unwrap(), ChainResolution::Plain);
    }

    #[test]
    fn test_resolve_relation_and_property() {
        let registry = registry();
        let org = registry.entity("Org").unwrap();
        assert_eq!(
            resolve_chain(&registry, org, "projs.org.name").unwrap(),
            ChainResolution::Property {
                chain: vec![segment("projs", None), segment("org", None)],
                property: "name".into(),
                property_key: "name".into(),
            }
        );
    }

    #[test]
    fn test_resolve_nested_json_property() {
        let registry = registry();
        let org = registry.entity("Org").unwrap();
        assert_eq!(
            resolve_chain(&registry, org, "projs.meta.a.b").unwrap(),
            ChainResolution::Property {
                chain: vec![segment("projs", None)],
                property: "meta".into(),
                property_key: "meta.a.b".into(),
            }
        );
    }

    #[test]
    fn test_resolve_chain_only() {
        let registry = registry();
        let org = registry.entity("Org").unwrap();
        assert_eq!(
            resolve_chain(&registry, org, "projs").unwrap(),
            ChainResolution::Relations(vec![segment("projs", None)])
        );
    }

    #[test]
    fn test_unknown_path_is_fatal() {
        let registry = registry();
        let org = registry.entity("Org").unwrap();
        assert!(matches!(
            resolve_chain(&registry, org, "nothing.here"),
            Err(CompileError::UnknownPath { .. })
        ));
    }

    #[test]
    fn test_property_not_on_target() {
        let registry = registry();
        let org = registry.entity("Org").unwrap();
        let result = resolve_chain(&registry, org, "projs.missing");
        assert!(matches!(
            result,
            Err(CompileError::PropertyNotOnTarget { property, entity, .. })
                if property == "missing" && entity == "Proj"
        ));
    }

    #[test]
    fn test_polymorphic_target_allows_unknown_property() {
        let registry = registry();
        let transport = registry.entity("Transport").unwrap();
        assert!(matches!(
            resolve_chain(&registry, transport, "deliverable.parcelTitle"),
            Ok(ChainResolution::Property { .. })
        ));
        assert!(matches!(
            resolve_chain(&registry, transport, "deliverable(Parcel).parcelTitle"),
            Ok(ChainResolution::Property { .. })
        ));
    }

    #[test]
    fn test_misplaced_tags() {
        let registry = registry();
        let org = registry.entity("Org").unwrap();
        let transport = registry.entity("Transport").unwrap();

        // Tag on a non-polymorphic relation.
        assert!(matches!(
            resolve_chain(&registry, org, "projs(Proj).title"),
            Err(CompileError::InvalidPolymorphicUsage { .. })
        ));
        // Tag on a property.
        assert!(matches!(
            resolve_chain(&registry, transport, "deliverable.parcelTitle(Parcel)"),
            Err(CompileError::InvalidPolymorphicUsage { .. })
        ));
        assert!(matches!(
            resolve_chain(&registry, org, "name(X)"),
            Err(CompileError::InvalidPolymorphicUsage { .. })
        ));
    }

    #[test]
    fn test_unregistered_tag_is_fatal() {
        let registry = registry();
        let transport = registry.entity("Transport").unwrap();
        assert!(matches!(
            resolve_chain(&registry, transport, "deliverable(Letter).title"),
            Err(CompileError::Schema(SchemaError::UnregisteredTarget { target, .. })) if target == "Letter"
        ));
    }
}
