//! Input preview: infer the library type from XS-tag concordance and bound
//! the insert-size range before the real pass over the BAM.

use crate::config::{Config, LibraryType};
use anyhow::{Context, Result};
use rust_htslib::bam::{self, Read};

const MAX_PREVIEW_READS: usize = 500_000;
const MIN_STRAND_VOTES: usize = 100;
const STRAND_VOTE_FRACTION: f64 = 0.8;

#[derive(Debug, Default)]
pub struct Preview {
    pub library_type: Option<LibraryType>,
    pub insertsize_low: i32,
    pub insertsize_median: i32,
    pub insertsize_high: i32,
    pub reads_seen: usize,
}

/// Scan the head of the BAM and update `cfg` in place with whatever the
/// preview could determine.
pub fn preview(cfg: &mut Config) -> Result<Preview> {
    let mut reader = bam::Reader::from_path(&cfg.input_file)
        .with_context(|| format!("failed to open {}", cfg.input_file.display()))?;

    let mut first_votes = 0usize;
    let mut second_votes = 0usize;
    let mut total_votes = 0usize;
    let mut isizes: Vec<i32> = Vec::new();

    let mut record = bam::Record::new();
    let mut seen = 0usize;
    while let Some(r) = reader.read(&mut record) {
        r.context("failed to read BAM record during preview")?;
        seen += 1;
        if seen > MAX_PREVIEW_READS {
            break;
        }
        if record.is_unmapped() || record.is_secondary() {
            continue;
        }

        let isz = record.insert_size();
        if record.is_proper_pair() && isz > 0 && isz < 100_000 {
            isizes.push(isz as i32);
        }

        let Some(xs) = xs_tag(&record) else { continue };
        if xs != '+' && xs != '-' {
            continue;
        }
        let rev = record.is_reverse();
        let paired = record.is_paired();
        let first = record.is_first_in_template();

        // What each stranded protocol would predict for this read.
        let fr_first = if paired {
            if first == rev { '+' } else { '-' }
        } else if rev {
            '+'
        } else {
            '-'
        };
        total_votes += 1;
        if fr_first == xs {
            first_votes += 1;
        } else {
            second_votes += 1;
        }
    }

    let mut pv = Preview {
        reads_seen: seen,
        ..Preview::default()
    };

    if total_votes >= MIN_STRAND_VOTES {
        let t = total_votes as f64;
        if first_votes as f64 > t * STRAND_VOTE_FRACTION {
            pv.library_type = Some(LibraryType::FrFirst);
        } else if second_votes as f64 > t * STRAND_VOTE_FRACTION {
            pv.library_type = Some(LibraryType::FrSecond);
        } else {
            pv.library_type = Some(LibraryType::Unstranded);
        }
    }

    if !isizes.is_empty() {
        isizes.sort_unstable();
        let pick = |q: f64| isizes[((isizes.len() - 1) as f64 * q) as usize];
        pv.insertsize_low = pick(0.005);
        pv.insertsize_median = pick(0.5);
        pv.insertsize_high = pick(0.995);
    }

    if !cfg.library_type_set {
        if let Some(lt) = pv.library_type {
            cfg.library_type = lt;
        }
    }
    if pv.insertsize_high > 0 {
        cfg.insertsize_low = pv.insertsize_low.max(1);
        cfg.insertsize_median = pv.insertsize_median;
        cfg.insertsize_high = pv.insertsize_high;
    }

    tracing::info!(
        reads = pv.reads_seen,
        library_type = ?cfg.library_type,
        isize_low = cfg.insertsize_low,
        isize_median = cfg.insertsize_median,
        isize_high = cfg.insertsize_high,
        "preview complete"
    );
    Ok(pv)
}

fn xs_tag(record: &bam::Record) -> Option<char> {
    match record.aux(b"XS").ok()? {
        bam::record::Aux::Char(c) => Some(c as char),
        bam::record::Aux::String(s) => s.chars().next(),
        _ => None,
    }
}
