//! Built-in table of known pathogenic TR loci.
//!
//! Mirrors the curated BED table the original system shipped: locus span,
//! repeat motif, pathogenic copy-number threshold, inheritance, disease and
//! gene. Coordinates are hg38.

use trbrowse_core::region::Region;

#[derive(Debug, Clone)]
pub struct PathogenicLocus {
    pub region: Region,
    pub motif: &'static str,
    /// Copy-number count at or above which the expansion is pathogenic.
    pub threshold: f64,
    pub inheritance: &'static str,
    pub disease: &'static str,
    pub gene: &'static str,
}

fn locus(
    chrom: &str,
    start: u64,
    end: u64,
    motif: &'static str,
    threshold: f64,
    inheritance: &'static str,
    disease: &'static str,
    gene: &'static str,
) -> PathogenicLocus {
    PathogenicLocus {
        region: Region {
            chrom: chrom.to_string(),
            start,
            end,
        },
        motif,
        threshold,
        inheritance,
        disease,
        gene,
    }
}

pub fn known_loci() -> Vec<PathogenicLocus> {
    vec![
        locus(
            "chr4",
            3074876,
            3074940,
            "CAG",
            36.0,
            "AD",
            "Huntington disease",
            "HTT",
        ),
        locus(
            "chr19",
            45770204,
            45770266,
            "CTG",
            50.0,
            "AD",
            "Myotonic dystrophy type 1",
            "DMPK",
        ),
        locus(
            "chrX",
            147912050,
            147912110,
            "CGG",
            200.0,
            "XLD",
            "Fragile X syndrome",
            "FMR1",
        ),
        locus(
            "chr9",
            27573528,
            27573546,
            "GGGGCC",
            31.0,
            "AD",
            "C9orf72 ALS/FTD",
            "C9orf72",
        ),
        locus(
            "chr6",
            16327633,
            16327723,
            "CAG",
            39.0,
            "AD",
            "Spinocerebellar ataxia type 1",
            "ATXN1",
        ),
        locus(
            "chr14",
            92071010,
            92071040,
            "CAG",
            60.0,
            "AD",
            "Spinocerebellar ataxia type 3",
            "ATXN3",
        ),
        locus(
            "chrX",
            67545316,
            67545385,
            "CAG",
            38.0,
            "XLR",
            "Spinal and bulbar muscular atrophy",
            "AR",
        ),
    ]
}

/// First known locus overlapping `region`, if any.
pub fn find_overlapping<'a>(
    loci: &'a [PathogenicLocus],
    region: &Region,
) -> Option<&'a PathogenicLocus> {
    loci.iter().find(|l| l.region.overlaps(region))
}
