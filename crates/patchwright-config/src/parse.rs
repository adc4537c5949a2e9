//! Parsing one config document into named descriptors.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::ConfigError;

/// Text format of a config document, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// `.yml` and `.yaml` are YAML; anything else is read as JSON.
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => Self::Yaml,
            _ => Self::Json,
        }
    }

    fn read<T: DeserializeOwned>(self, text: &str) -> Result<T, String> {
        match self {
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        }
    }
}

/// Parse `text`, read from `path`, into `(template name, descriptor)` pairs.
///
/// The document is first read as a batch mapping template names to records.
/// If that fails, it is read as one record named after the file stem.
///
/// Unknown keys are ignored, so a single record whose fields are all nested
/// objects also reads as a batch of empty records. A record with no fields
/// set is therefore never accepted: a batch holding one falls through to
/// the single-record reading, and a single record with none is an error.
pub fn parse_document<D>(path: &Path, text: &str) -> Result<Vec<(String, D)>, ConfigError>
where
    D: DeserializeOwned + Default + PartialEq,
{
    let format = Format::of(path);
    let batch_error = match format.read::<BTreeMap<String, D>>(text) {
        Ok(batch) if batch.is_empty() => "empty document".to_owned(),
        Ok(batch) if batch.values().all(|d| *d != D::default()) => {
            return Ok(batch.into_iter().collect())
        }
        Ok(_) => "entry with no fields set".to_owned(),
        Err(err) => err,
    };

    let parse_error = |details: String| ConfigError::Parse {
        path: path.to_path_buf(),
        details,
    };
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return Err(parse_error(format!("{batch_error}; file stem is not valid UTF-8")));
    };

    match format.read::<D>(text) {
        Ok(single) if single != D::default() => Ok(vec![(stem.to_owned(), single)]),
        Ok(_) => Err(parse_error(format!("as batch: {batch_error}; as record: no fields set"))),
        Err(err) => Err(parse_error(format!("as batch: {batch_error}; as record: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchwright_core::descriptor::{
        ContainerSpec, ItemDescriptor, MonsterDescriptor, PieceDescriptor, Requirement,
    };

    #[test]
    fn batch_document_yields_every_entry() {
        let text = r#"{ "Boar": { "Health": 40 }, "Wolf": { "m_health": 80, "WalkSpeed": 3.5 } }"#;
        let entries = parse_document::<MonsterDescriptor>(Path::new("wild.json"), text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "Boar");
        assert_eq!(entries[1].1.health, Some(80));
        assert_eq!(entries[1].1.walk_speed, Some(3.5));
    }

    #[test]
    fn single_record_is_named_after_the_file() {
        let text = r#"{ "Health": 50, "clonePrefabName": "Deer" }"#;
        let entries = parse_document::<MonsterDescriptor>(Path::new("dir/TrophyDeer.json"), text).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "TrophyDeer");
        assert_eq!(entries[0].1.health, Some(50));
        assert_eq!(entries[0].1.clone_source, "Deer");
    }

    #[test]
    fn item_aliases_and_requirement_strings() {
        let text = r#"{
            "m_name": "Gold sword",
            "craftingStation": "forge",
            "minStationLevel": 2,
            "reqs": ["Gold:10:True", "Wood:2"],
            "Damages": { "Slash": 50 }
        }"#;
        let entries = parse_document::<ItemDescriptor>(Path::new("SwordGold.json"), text).unwrap();
        let d = &entries[0].1;
        assert_eq!(d.name, "Gold sword");
        assert_eq!(d.crafting_station, "forge");
        assert_eq!(d.repair_station_level, Some(2));
        assert_eq!(
            d.craft.as_deref(),
            Some(&[Requirement::new("Gold", 10, true), Requirement::new("Wood", 2, false)][..])
        );
        assert_eq!(d.damage.unwrap().slash, 50);
        assert!(d.has_recipe);
    }

    #[test]
    fn nested_single_record_is_not_mistaken_for_a_batch() {
        let text = r#"{ "Container": { "Width": 6, "Height": 4 } }"#;
        let entries = parse_document::<PieceDescriptor>(Path::new("chest.json"), text).unwrap();
        assert_eq!(entries[0].0, "chest");
        assert_eq!(entries[0].1.container, Some(ContainerSpec { width: 6, height: 4 }));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_document::<MonsterDescriptor>(Path::new("Deer.json"), "{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("Deer.json"));
    }

    #[test]
    fn broken_batch_entry_is_not_loaded_as_empty_record() {
        let text = r#"{ "SwordIron": { "Craft": ["Wood"] } }"#;
        let err = parse_document::<ItemDescriptor>(Path::new("swords.json"), text).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn yaml_batch_with_aliases() {
        let text = "\
SwordGold:
  clonePrefabName: SwordIron
  reqs:
    - Gold:10:True
    - Wood:2
  Damages:
    Slash: 50
Club:
  Weight: 4
  Unknown: ignored
";
        let entries = parse_document::<ItemDescriptor>(Path::new("weapons.yml"), text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "Club");
        assert_eq!(entries[0].1.weight, Some(4));
        let gold = &entries[1].1;
        assert_eq!(gold.clone_source, "SwordIron");
        assert_eq!(
            gold.craft.as_deref(),
            Some(&[Requirement::new("Gold", 10, true), Requirement::new("Wood", 2, false)][..])
        );
        assert_eq!(gold.damage.unwrap().slash, 50);
    }

    #[test]
    fn yaml_single_record_is_named_after_the_file() {
        let text = "Health: 50\nWalkSpeed: 3.5\nclonePrefabName: Deer\n";
        let entries = parse_document::<MonsterDescriptor>(Path::new("TrophyDeer.YAML"), text).unwrap();
        assert_eq!(entries[0].0, "TrophyDeer");
        assert_eq!(entries[0].1.health, Some(50));
        assert_eq!(entries[0].1.walk_speed, Some(3.5));
    }

    #[test]
    fn yaml_nested_single_record_is_not_mistaken_for_a_batch() {
        let text = "Container:\n  Width: 6\n  Height: 4\n";
        let entries = parse_document::<PieceDescriptor>(Path::new("chest.yaml"), text).unwrap();
        assert_eq!(entries[0].0, "chest");
        assert_eq!(entries[0].1.container, Some(ContainerSpec { width: 6, height: 4 }));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(Format::of(Path::new("a/b.yml")), Format::Yaml);
        assert_eq!(Format::of(Path::new("b.Yaml")), Format::Yaml);
        assert_eq!(Format::of(Path::new("b.json")), Format::Json);
    }

    #[test]
    fn empty_document_is_rejected() {
        assert!(parse_document::<MonsterDescriptor>(Path::new("Deer.json"), "{}").is_err());
    }
}
