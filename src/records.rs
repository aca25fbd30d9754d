use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One row of the flat taxonomy table as served by
/// `GET /api/admin/catalog/categories`.
///
/// Depth is encoded positionally: `DEPT > TYP > SUBTYP_1 > SUBTYP_2 > SUBTYP_3`.
/// A column holding `""` or `"EMPTY"` is not used by the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyRow {
    #[serde(rename = "WEB_TAXONOMY_ID")]
    pub id: i64,

    #[serde(rename = "DEPT", default, deserialize_with = "empty_if_null")]
    pub dept: String,

    #[serde(rename = "TYP", default, deserialize_with = "empty_if_null")]
    pub typ: String,

    #[serde(rename = "SUBTYP_1", default, deserialize_with = "empty_if_null")]
    pub subtyp1: String,

    #[serde(rename = "SUBTYP_2", default, deserialize_with = "empty_if_null")]
    pub subtyp2: String,

    #[serde(rename = "SUBTYP_3", default, deserialize_with = "empty_if_null")]
    pub subtyp3: String,

    #[serde(rename = "WEB_URL", default, deserialize_with = "empty_if_null")]
    pub url: String,

    #[serde(
        rename = "ACTIVE",
        default,
        serialize_with = "flag_as_int",
        deserialize_with = "flag_from_int_or_bool"
    )]
    pub active: bool,
}

impl TaxonomyRow {
    /// Classification columns, shallowest first.
    pub fn levels(&self) -> [&str; 5] {
        [
            &self.dept,
            &self.typ,
            &self.subtyp1,
            &self.subtyp2,
            &self.subtyp3,
        ]
    }
}

/// Full record returned by `GET /api/admin/catalog/categories/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDetail {
    #[serde(rename = "WEB_TAXONOMY_ID")]
    pub id: i64,
    #[serde(rename = "DEPT", default, deserialize_with = "empty_if_null")]
    pub dept: String,
    #[serde(rename = "TYP", default, deserialize_with = "empty_if_null")]
    pub typ: String,
    #[serde(rename = "SUBTYP_1", default, deserialize_with = "empty_if_null")]
    pub subtyp1: String,
    #[serde(rename = "SUBTYP_2", default, deserialize_with = "empty_if_null")]
    pub subtyp2: String,
    #[serde(rename = "SUBTYP_3", default, deserialize_with = "empty_if_null")]
    pub subtyp3: String,
    #[serde(rename = "WEB_URL", default, deserialize_with = "empty_if_null")]
    pub url: String,
    #[serde(
        rename = "ACTIVE",
        default,
        serialize_with = "flag_as_int",
        deserialize_with = "flag_from_int_or_bool"
    )]
    pub active: bool,

    #[serde(rename = "LONG_DESCRIPTION", default)]
    pub long_description: Option<String>,
    #[serde(rename = "SHORT_DESC", default)]
    pub short_desc: Option<String>,
    #[serde(rename = "META_TAGS", default)]
    pub meta_tags: Option<String>,
    #[serde(rename = "SORT_POSITION", default)]
    pub sort_position: Option<i64>,
    #[serde(rename = "CREATED_AT", default)]
    pub created_at: Option<String>,
    #[serde(rename = "UPDATED_AT", default)]
    pub updated_at: Option<String>,
}

// Text formats may send null for unused columns; binary snapshots always hold a string.
fn empty_if_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    if deserializer.is_human_readable() {
        Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
    } else {
        String::deserialize(deserializer)
    }
}

fn flag_as_int<S>(active: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if serializer.is_human_readable() {
        serializer.serialize_u8(u8::from(*active))
    } else {
        serializer.serialize_bool(*active)
    }
}

fn flag_from_int_or_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Null(()),
    }

    if !deserializer.is_human_readable() {
        return bool::deserialize(deserializer);
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Null(()) => false,
    })
}
