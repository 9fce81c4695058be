//! Static code tables of the property-assessment roll.
//!
//! Unknown codes are never fatal: callers log them and keep the raw value.

/// Land-use codes (CUBF) worth ingesting: residential units and the
/// commercial/industrial uses likely to host prefab metal buildings.
pub const CUBFS_TO_KEEP: &[i32] = &[
    1000, 1511, 1512, 1521, 1522, 1541, 1543, 1551, 1553, 1590, 2799, 5001, 5010, 5712, 5811,
    5812, 6241, 6299, 6379, 6411, 6419, 6516, 6519, 6531, 6532, 6534, 6539, 6541, 6542, 6643,
    6713, 6722, 6811, 6812, 6813, 6814, 6815, 6816, 6821, 6823, 6911, 6994, 6997, 6999, 7116,
    7219, 7221, 7222, 7223, 7224, 7225, 7229, 7233, 7239, 7290, 7311, 7312, 7313, 7314, 7392,
    7393, 7394, 7395, 7396, 7397, 7399, 7411, 7412, 7413, 7414, 7415, 7416, 7417, 7418, 7419,
    7421, 7422, 7423, 7424, 7425, 7429, 7431, 7432, 7433, 7441, 7442, 7443, 7444, 7445, 7446,
    7447, 7448, 7449, 7451, 7452, 7459, 7491, 7492, 7493, 7499, 7611, 9100, 9530,
];

/// Disaggregated multi-unit residential building.
pub const MURB_CUBF: i32 = 1000;

pub fn is_kept_cubf(cubf: i32) -> bool {
    CUBFS_TO_KEEP.binary_search(&cubf).is_ok()
}

pub const WAY_TYPES: &[(&str, &str)] = &[
    ("AL", "allée"),
    ("AU", "autoroute"),
    ("AV", "avenue"),
    ("BO", "boulevard"),
    ("CA", "carré"),
    ("CH", "chemin"),
    ("CI", "circuit"),
    ("CO", "côte"),
    ("CR", "croissant"),
    ("DO", "domaine"),
    ("IM", "impasse"),
    ("MT", "montée"),
    ("PA", "parc"),
    ("PC", "place"),
    ("PR", "promenade"),
    ("QU", "quai"),
    ("RG", "rang"),
    ("RL", "ruelle"),
    ("RO", "route"),
    ("RU", "rue"),
    ("SE", "sentier"),
    ("TE", "terrasse"),
    ("TR", "terrain"),
];

pub const WAY_LINKS: &[(&str, &str)] = &[
    ("1", "de"),
    ("2", "du"),
    ("3", "des"),
    ("4", "de la"),
    ("5", "de l'"),
    ("6", "d'"),
    ("7", "à la"),
    ("8", "aux"),
];

pub const CARDINAL_POINTS: &[(&str, &str)] = &[
    ("N", "Nord"),
    ("S", "Sud"),
    ("E", "Est"),
    ("O", "Ouest"),
];

pub const OWNER_STATUSES: &[(&str, &str)] = &[
    ("1", "Propriétaire"),
    ("2", "Emphytéote"),
    ("3", "Usufruitier"),
    ("4", "Grevé de substitution"),
    ("5", "Possesseur"),
];

pub const PHYSICAL_LINKS: &[(&str, &str)] = &[
    ("1", "Détaché"),
    ("2", "Jumelé"),
    ("3", "En rangée"),
    ("4", "Intégré"),
    ("5", "En rangée sur un côté"),
];

pub const CONSTRUCTION_TYPES: &[(&str, &str)] = &[
    ("1", "Unimodulaire"),
    ("2", "Étagement mansardé"),
    ("3", "Étagement demi-niveau"),
    ("4", "Étagement partiel"),
    ("5", "Étagement entier"),
];

pub const PHYS_LINK_DETACHED: &str = "1";
pub const CONST_TYPE_FULL_STOREY: &str = "5";

pub fn lookup(table: &[(&str, &'static str)], code: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(code))
        .map(|(_, v)| *v)
}

/// Human-readable value for `code`, or the raw code with a warning.
pub fn resolve_or_raw(table: &[(&str, &'static str)], code: &str, what: &str) -> String {
    match lookup(table, code) {
        Some(value) => value.to_string(),
        None => {
            log::warn!("Unknown {} {}", what, code);
            code.to_string()
        }
    }
}
