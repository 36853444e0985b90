/// A Local Swimming Committee belonging to a region (zone).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lsc {
    pub code: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub name: &'static str,
    pub lscs: &'static [Lsc],
}

const fn lsc(code: &'static str, name: &'static str) -> Lsc {
    Lsc { code, name }
}

pub static REGIONS: [Region; 4] = [
    Region {
        name: "Eastern",
        lscs: &[
            lsc("AD", "Adirondack Swimming"),
            lsc("AM", "Allegheny Mountain"),
            lsc("CT", "Connecticut Swimming"),
            lsc("ME", "Maine Swimming"),
            lsc("MD", "Maryland Swimming"),
            lsc("MET", "Metropolitan Swimming"),
            lsc("MA", "Middle Atlantic Swimming"),
            lsc("NE", "New England Swimming"),
            lsc("NJ", "New Jersey Swimming"),
            lsc("NI", "Niagara Swimming"),
            lsc("PV", "Potomac Valley Swimming"),
            lsc("VA", "Virginia Swimming"),
        ],
    },
    Region {
        name: "Southern",
        lscs: &[
            lsc("BOR", "Border Swimming"),
            lsc("FGC", "Florida Gold Coast"),
            lsc("FL", "Florida Swimming"),
            lsc("GA", "Georgia Swimming"),
            lsc("GULF", "Gulf Swimming"),
            lsc("KY", "Kentucky Swimming"),
            lsc("LA", "Louisiana Swimming"),
            lsc("MS", "Mississippi Swimming"),
            lsc("NC", "North Carolina Swimming"),
            lsc("NTX", "North Texas Swimming"),
            lsc("SC", "South Carolina Swimming"),
            lsc("STX", "South Texas Swimming"),
            lsc("SE", "Southeastern Swimming"),
            lsc("WTX", "West Texas Swimming"),
            lsc("WV", "West Virginia Swimming"),
        ],
    },
    Region {
        name: "Central",
        lscs: &[
            lsc("AR", "Arkansas Swimming"),
            lsc("IL", "Illinois Swimming"),
            lsc("IN", "Indiana Swimming"),
            lsc("IA", "Iowa Swimming"),
            lsc("LE", "Lake Erie Swimming"),
            lsc("MI", "Michigan Swimming"),
            lsc("MW", "Midwestern Swimming"),
            lsc("MN", "Minnesota Swimming"),
            lsc("MV", "Missouri Valley Swimming"),
            lsc("ND", "North Dakota Swimming"),
            lsc("OH", "Ohio Swimming"),
            lsc("OK", "Oklahoma Swimming"),
            lsc("OZ", "Ozark Swimming"),
            lsc("SD", "South Dakota Swimming"),
            lsc("WI", "Wisconsin Swimming"),
        ],
    },
    Region {
        name: "Western",
        lscs: &[
            lsc("AK", "Alaska Swimming"),
            lsc("AZ", "Arizona Swimming"),
            lsc("CC", "Central California"),
            lsc("CO", "Colorado Swimming"),
            lsc("HA", "Hawaiian Swimming"),
            lsc("IE", "Inland Empire Swimming"),
            lsc("MT", "Montana Swimming"),
            lsc("NM", "New Mexico Swimming"),
            lsc("OR", "Oregon Swimming"),
            lsc("PNW", "Pacific Northwest"),
            lsc("PC", "Pacific Swimming"),
            lsc("SDI", "San Diego-Imperial"),
            lsc("SN", "Sierra Nevada Swimming"),
            lsc("SR", "Snake River Swimming"),
            // Southern California shares its code with South Carolina.
            lsc("SC", "Southern California"),
            lsc("UT", "Utah Swimming"),
            lsc("WY", "Wyoming Swimming"),
        ],
    },
];

/// Looks up a region by name, ignoring case.
pub fn find_region(name: &str) -> Option<&'static Region> {
    REGIONS
        .iter()
        .find(|region| region.name.eq_ignore_ascii_case(name.trim()))
}

/// Returns the canonical code if any region knows this LSC.
pub fn find_lsc_code(code: &str) -> Option<&'static str> {
    REGIONS
        .iter()
        .flat_map(|region| region.lscs.iter())
        .find(|lsc| lsc.code.eq_ignore_ascii_case(code.trim()))
        .map(|lsc| lsc.code)
}

impl Region {
    pub fn contains_lsc(&self, code: &str) -> bool {
        self.lscs.iter().any(|lsc| lsc.code.eq_ignore_ascii_case(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_region_is_case_insensitive() {
        assert_eq!(find_region("southern").map(|r| r.name), Some("Southern"));
        assert!(find_region("Northern").is_none());
    }

    #[test]
    fn test_lsc_membership() {
        let southern = find_region("Southern").unwrap();
        assert!(southern.contains_lsc("LA"));
        assert!(!southern.contains_lsc("PC"));
        assert_eq!(find_lsc_code("pnw"), Some("PNW"));
    }

    #[test]
    fn test_shared_lsc_code_belongs_to_both_regions() {
        assert!(find_region("Southern").unwrap().contains_lsc("SC"));
        assert!(find_region("Western").unwrap().contains_lsc("SC"));
    }
}
