//! IEEE MAC assignment csv parsing
//!
//! The csv files have the form
//!
//! ```text
//! Registry,Assignment,Organization Name,Organization Address
//! MA-L,000000,XEROX CORPORATION,M/S 105-50C WEBSTER NY US 14580
//! MA-L,00000C,"Cisco Systems, Inc",170 WEST TASMAN DRIVE SAN JOSE CA US 95134-1706
//! MA-M,0055DA5,Nanoleaf,"100 Front Street East, 4th Floor Toronto Ontario CA M5A 1E1 "
//! MA-S,70B3D5E3D,Leo Bodnar Electronics Ltd,Unit 8 New Rookery Farm Silverstone  GB NN12 8UP
//! ```
//!
//! Organization names containing commas are enclosed in double quotes. Only
//! the first three fields matter here; rows whose registry is not MA-L,
//! MA-M or MA-S (the header line included) are skipped.

use std::io::BufRead;

use ipwatch_core::Result;
use ipwatch_db::VendorEntry;

/// Parse one csv file into loadable vendor entries
///
/// The assignment length (6, 7 or 9 hex digits) determines the entry's
/// registry; an MA-tagged row with any other assignment shape is an error,
/// as it means the file format has changed under us.
pub fn parse_malist<R: BufRead>(reader: R) -> Result<Vec<VendorEntry>> {
    let mut entries = Vec::new();

    for line in reader.lines() {
        let line = line?;

        let Some((registry, rest)) = line.split_once(',') else {
            continue;
        };
        if !matches!(registry, "MA-L" | "MA-M" | "MA-S") {
            continue;
        }

        let Some((assignment, rest)) = rest.split_once(',') else {
            continue;
        };

        let organization = match rest.strip_prefix('"') {
            Some(quoted) => quoted.split('"').next().unwrap_or(""),
            None => rest.split(',').next().unwrap_or(""),
        };

        entries.push(VendorEntry::from_assignment(assignment, organization.trim_end())?);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipwatch_db::MaRegistry;

    const SAMPLE: &str = "\
Registry,Assignment,Organization Name,Organization Address
MA-L,000000,XEROX CORPORATION,M/S 105-50C WEBSTER NY US 14580
MA-L,00000C,\"Cisco Systems, Inc\",170 WEST TASMAN DRIVE SAN JOSE CA US 95134-1706
MA-L,00000E,FUJITSU LIMITED,\"403, Kosugi-cho 1-chome, Nakahara-ku Kawasaki Kanagawa JP 211-0063 \"
MA-M,0055DA5,Nanoleaf,\"100 Front Street East, 4th Floor Toronto Ontario CA M5A 1E1 \"
MA-S,70B3D5E3D,Leo Bodnar Electronics Ltd,Unit 8 New Rookery Farm Silverstone  GB NN12 8UP
IAB,0050C2DD6,Example Individual Block,somewhere
";

    #[test]
    fn test_parse_sample() {
        let entries = parse_malist(SAMPLE.as_bytes()).unwrap();
        assert_eq!(entries.len(), 5);

        assert_eq!(entries[0].prefix(), "00:00:00");
        assert_eq!(entries[0].organization(), "XEROX CORPORATION");
        assert_eq!(entries[0].registry(), MaRegistry::Large);

        // Quoted organization containing a comma
        assert_eq!(entries[1].prefix(), "00:00:0c");
        assert_eq!(entries[1].organization(), "Cisco Systems, Inc");

        // Unquoted organization, quoted address
        assert_eq!(entries[2].organization(), "FUJITSU LIMITED");

        assert_eq!(entries[3].prefix(), "00:55:da:5");
        assert_eq!(entries[3].registry(), MaRegistry::Medium);

        assert_eq!(entries[4].prefix(), "70:b3:d5:e3:d");
        assert_eq!(entries[4].registry(), MaRegistry::Small);
    }

    #[test]
    fn test_header_and_other_registries_skipped() {
        let entries = parse_malist("Registry,Assignment,Organization Name\n".as_bytes()).unwrap();
        assert!(entries.is_empty());

        let entries = parse_malist("CID,ABC123,Example,addr\n".as_bytes()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_bad_assignment_is_an_error() {
        let result = parse_malist("MA-L,00,Too Short,addr\n".as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_line_skipped() {
        let entries = parse_malist("no commas here\nMA-L\n".as_bytes()).unwrap();
        assert!(entries.is_empty());
    }
}
