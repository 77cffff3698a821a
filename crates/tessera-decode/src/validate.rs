//! Transcript archive sanity check
//!
//! Before a dataset is accepted, the first two `.bin` members are decoded
//! and the gene name of each tile's first point must look like a gene
//! symbol. This catches archives built for another layout, which decode
//! "successfully" into garbage strings.

use crate::error::DecodeError;
use crate::tile::TileDecoder;
use regex::Regex;
use tessera_model::{GeneTable, TileKey};

const GENE_NAME_PATTERN: &str = r"^[A-Za-z0-9_\-.]+$";

/// Number of tile members inspected
const SAMPLE_MEMBERS: usize = 2;

/// Check the leading transcript members of an archive
///
/// Archives without `.bin` members pass; tiles with no points are skipped.
///
/// # Errors
/// - `DecodeError::InvalidTranscriptFile` naming the first offending member
pub fn validate_transcript_members<'a, I>(members: I, decoder: &TileDecoder) -> Result<(), DecodeError>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let pattern = Regex::new(GENE_NAME_PATTERN)?;

    let samples = members
        .into_iter()
        .filter(|(path, _)| path.ends_with(".bin"))
        .take(SAMPLE_MEMBERS);

    for (path, bytes) in samples {
        let invalid = |reason: String| DecodeError::InvalidTranscriptFile {
            path: path.to_string(),
            reason,
        };

        let key = TileKey::from_member_path(path).unwrap_or(TileKey::new(0, 0, 0));
        let mut genes = GeneTable::new();
        let tile = decoder
            .decode_tile(key, bytes, &mut genes)
            .map_err(|err| invalid(err.to_string()))?
            .into_value();

        let Some(first) = tile.points().first() else {
            continue;
        };

        let name = genes.name(first.gene).unwrap_or_default();
        if name.is_empty() {
            return Err(invalid("first point has no gene name".to_string()));
        }
        if !pattern.is_match(name) {
            return Err(invalid(format!("gene name '{name}' is not a gene symbol")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::RecordWriter;
    use tessera_model::LayerConfig;

    fn tile(gene: &str) -> Vec<u8> {
        let mut writer = RecordWriter::new();
        writer.transcript([0.0, 0.0], gene, None);
        writer.finish()
    }

    fn decoder() -> TileDecoder {
        TileDecoder::with_default_schema(LayerConfig::default())
    }

    #[test]
    fn accepts_gene_symbols() {
        let a = tile("ACTB");
        let b = tile("HLA-DRB1.2");
        let members = [("t/0/0/0.bin", &a[..]), ("t/1/0/0.bin", &b[..])];
        assert!(validate_transcript_members(members, &decoder()).is_ok());
    }

    #[test]
    fn rejects_garbage_gene_name() {
        let good = tile("ACTB");
        let bad = tile("not a gene!");
        let members = [
            ("config.json", &b"{}"[..]),
            ("t/0/0/0.bin", &good[..]),
            ("t/1/0/0.bin", &bad[..]),
        ];
        let err = validate_transcript_members(members, &decoder()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidTranscriptFile { ref path, .. } if path == "t/1/0/0.bin"
        ));
    }

    #[test]
    fn only_first_two_members_are_sampled() {
        let good = tile("ACTB");
        let bad = tile("???");
        let members = [
            ("t/0/0/0.bin", &good[..]),
            ("t/1/0/0.bin", &good[..]),
            ("t/1/1/0.bin", &bad[..]),
        ];
        assert!(validate_transcript_members(members, &decoder()).is_ok());
    }

    #[test]
    fn empty_tiles_and_no_members_pass() {
        assert!(validate_transcript_members(std::iter::empty(), &decoder()).is_ok());
        let members = [("t/0/0/0.bin", &[0u8; 0][..])];
        assert!(validate_transcript_members(members, &decoder()).is_ok());
    }

    #[test]
    fn undecodable_member_fails() {
        let members = [("t/0/0/0.bin", &[9, 0, 0, 0, 1, 2][..])];
        assert!(matches!(
            validate_transcript_members(members, &decoder()),
            Err(DecodeError::InvalidTranscriptFile { .. })
        ));
    }
}
