use crate::types::{AccessionFamily, AccessionShape};

/// Published decision-table entries, keyed by [`AccessionShape::shape12`].
///
/// These are the eight shapes §4.1 calls out by name (extension- and
/// suffix-bearing accession families such as versioned RefSeq ids). Expressed
/// as data, per §9.6, rather than inlined match arms, so extending this table
/// against corpus evidence is a one-line change.
const TABLE: &[(u16, AccessionFamily)] = &[
    (0x015, AccessionFamily::Tabled),
    (0x026, AccessionFamily::Tabled),
    (0x106, AccessionFamily::Tabled),
    (0x126, AccessionFamily::Tabled),
    (0x109, AccessionFamily::Tabled),
    (0x142, AccessionFamily::Tabled),
    (0x148, AccessionFamily::Tabled),
    (0x149, AccessionFamily::Tabled),
];

/// Looks up `token`/`shape` against the literal `NA…` annotation prefix and
/// the decision table, falling back to the "bare run" default rule when the
/// shape has no extension or suffix.
pub fn classify(token: &str, shape: AccessionShape) -> Option<AccessionFamily> {
    if token.as_bytes().starts_with(b"NA") {
        return Some(AccessionFamily::Annotation);
    }
    if let Some((_, family)) = TABLE.iter().find(|(code, _)| *code == shape.shape12()) {
        return Some(*family);
    }
    if shape.is_plain_run() {
        return Some(AccessionFamily::Plain);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srr_style_shape_is_recognized_as_plain() {
        // "SRR001656": 3 alpha ("SRR"), 6 digit ("001656"), no ext, no suffix.
        let shape = AccessionShape {
            prefix: 0,
            alpha: 3,
            digit: 6,
            ext: 0,
            suffix: 0,
        };
        assert_eq!(shape.shape12(), 0x036);
        assert_eq!(classify("SRR001656", shape), Some(AccessionFamily::Plain));
    }

    #[test]
    fn versioned_refseq_style_shape_hits_table() {
        // "NC_000001.10"-like shape: 2 alpha, 6 digit, one dotted extension.
        let shape = AccessionShape {
            prefix: 0,
            alpha: 2,
            digit: 6,
            ext: 1,
            suffix: 0,
        };
        assert_eq!(shape.shape12(), 0x126);
        assert_eq!(classify("NC_000001.10", shape), Some(AccessionFamily::Tabled));
    }

    #[test]
    fn unrecognized_shape_stays_unclassified() {
        let shape = AccessionShape {
            prefix: 0,
            alpha: 1,
            digit: 0,
            ext: 2,
            suffix: 3,
        };
        assert_eq!(classify("X..", shape), None);
    }

    #[test]
    fn na_prefixed_token_is_recognized_as_annotation_regardless_of_shape() {
        // "NA000000001.1": shape alone wouldn't hit any table entry (alpha=2,
        // digit=9, ext=1 -> shape12 0x129, not in TABLE), but the literal `NA`
        // prefix always upgrades it.
        let shape = AccessionShape {
            prefix: 0,
            alpha: 2,
            digit: 9,
            ext: 1,
            suffix: 0,
        };
        assert!(TABLE.iter().all(|(code, _)| *code != shape.shape12()));
        assert_eq!(
            classify("NA000000001.1", shape),
            Some(AccessionFamily::Annotation)
        );
    }
}
