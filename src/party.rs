// 💐 Wedding Party - Bios for the people standing up with the couple

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bride,
    Groom,
    /// Officiant, ring bearer, anyone not on one side
    Both,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bride => "bride",
            Side::Groom => "groom",
            Side::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bride" => Some(Side::Bride),
            "groom" => Some(Side::Groom),
            "both" => Some(Side::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyMember {
    #[serde(default = "default_id")]
    pub id: String,

    pub name: String,

    /// e.g., "Maid of Honor", "Best Man", "Officiant"
    pub role: String,

    pub side: Side,

    #[serde(default)]
    pub bio: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Display position within the page
    #[serde(default)]
    pub sort_order: i64,
}

fn default_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl PartyMember {
    pub fn new(name: &str, role: &str, side: Side) -> Self {
        PartyMember {
            id: default_id(),
            name: name.to_string(),
            role: role.to_string(),
            side,
            bio: String::new(),
            image_url: None,
            sort_order: 0,
        }
    }
}

/// Members split per side, as the bios page lays them out
#[derive(Debug, Clone, Default, Serialize)]
pub struct PartyBySide {
    pub bride: Vec<PartyMember>,
    pub groom: Vec<PartyMember>,
    pub both: Vec<PartyMember>,
}

/// Group members by side, keeping their relative order
pub fn group_by_side(members: &[PartyMember]) -> PartyBySide {
    let mut grouped = PartyBySide::default();
    for member in members {
        let bucket = match member.side {
            Side::Bride => &mut grouped.bride,
            Side::Groom => &mut grouped.groom,
            Side::Both => &mut grouped.both,
        };
        bucket.push(member.clone());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_side_preserves_order() {
        let members = vec![
            PartyMember::new("Jess", "Maid of Honor", Side::Bride),
            PartyMember::new("Tom", "Best Man", Side::Groom),
            PartyMember::new("Priya", "Bridesmaid", Side::Bride),
            PartyMember::new("Rev. Lee", "Officiant", Side::Both),
        ];

        let grouped = group_by_side(&members);

        assert_eq!(
            grouped.bride.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            vec!["Jess", "Priya"]
        );
        assert_eq!(grouped.groom.len(), 1);
        assert_eq!(grouped.both[0].role, "Officiant");
    }

    #[test]
    fn test_side_parse() {
        assert_eq!(Side::parse("Bride"), Some(Side::Bride));
        assert_eq!(Side::parse(" groom "), Some(Side::Groom));
        assert_eq!(Side::parse("both"), Some(Side::Both));
        assert_eq!(Side::parse("neither"), None);
    }

    #[test]
    fn test_member_json_defaults() {
        let member: PartyMember =
            serde_json::from_str(r#"{"name":"Jess","role":"Maid of Honor","side":"bride"}"#)
                .unwrap();
        assert!(!member.id.is_empty());
        assert_eq!(member.side, Side::Bride);
        assert_eq!(member.sort_order, 0);
        assert!(member.bio.is_empty());
    }
}
