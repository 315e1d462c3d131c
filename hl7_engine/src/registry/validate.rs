//! First finalization pass: reference and metatype validation

use super::{EntityMaps, GrammarBuilder, ValidatedGrammar};
use crate::grammar::{Constituent, Entity, GrammarError, Metatype};
use crate::logging::codes;
use crate::log_success;

/// Backing entity of a leaf, if it exists and its metatype is allowed under
/// `parent`. Anything else is treated as an unknown type of unbounded length.
pub(crate) fn resolve_type<'m>(
    maps: &'m EntityMaps,
    parent: Metatype,
    type_ref: &str,
) -> Option<&'m Entity> {
    maps.get(type_ref)
        .filter(|entity| parent.allows_constituent(entity.metatype()))
}

fn check_leaf(maps: &EntityMaps, leaf: &Constituent) -> Option<GrammarError> {
    let type_ref = leaf.type_ref()?;
    let parent = leaf.parent_metatype;

    match maps.get(type_ref) {
        None => Some(GrammarError::unresolved_reference(
            &leaf.origin,
            &leaf.label(),
            type_ref,
        )),
        Some(entity) if !parent.allows_constituent(entity.metatype()) => {
            Some(GrammarError::metatype_mismatch(
                &leaf.origin,
                &leaf.label(),
                type_ref,
                entity.origin(),
                entity.metatype(),
                parent.allowed_constituents(),
            ))
        }
        Some(_) => None,
    }
}

impl GrammarBuilder {
    /// Check every leaf reference, layer by layer from subcomposites up to
    /// messages. Problems are recorded; nothing is removed.
    pub fn validate(self) -> ValidatedGrammar {
        let GrammarBuilder {
            maps, mut errors, ..
        } = self;

        let mut found = Vec::new();
        for metatype in Metatype::STRUCTURED {
            for entity in maps.layer(metatype).values() {
                for constituent in entity.constituents() {
                    constituent.for_each_leaf(&mut |leaf| {
                        if let Some(error) = check_leaf(&maps, leaf) {
                            found.push(error);
                        }
                    });
                }
            }
        }

        let problems = found.len();
        errors.extend(found);

        log_success!(codes::success::GRAMMAR_VALIDATED, "Grammar references validated",
            "entities" => maps.len(),
            "reference_errors" => problems
        );

        ValidatedGrammar { maps, errors }
    }
}
