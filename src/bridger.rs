//! Bridging: fill the gap between a fragment's mates with a best-supported
//! path through the region list.
//!
//! One pass runs per target genotype. A pass builds its transition support
//! only from hits whose fragments are genotype-compatible with the target, so
//! allele-specific bridging never borrows evidence across the allele line;
//! unphased fragments see everything.

use crate::bundle_base::BundleBase;
use crate::config::Config;
use crate::fragment::{Fragment, FragmentPath};
use crate::region::Region;
use crate::types::{HashMap, HashMapExt, HashSet};
use crate::util::{decode_vlist, encode_vlist};
use crate::vcf::{gt_conflict, Genotype};

/// Hard cap on the number of regions a bridge may cross.
const MAX_BRIDGE_SPAN: usize = 64;

pub fn bridge_pass(
    bb: &mut BundleBase,
    regions: &[Region],
    fragments: &mut [Fragment],
    breads: &mut HashSet<String>,
    target: Genotype,
    cfg: &Config,
) {
    let _ = cfg;
    let transitions = build_transitions(bb, fragments, target);

    for fr in fragments.iter_mut() {
        if fr.is_bridged() {
            continue;
        }
        let eligible = match target {
            Genotype::Allele1 | Genotype::Allele2 => fr.gt == target,
            _ => !matches!(fr.gt, Genotype::Allele1 | Genotype::Allele2),
        };
        if !eligible {
            continue;
        }

        let v1 = decode_vlist(&bb.hits[fr.h1].vlist);
        let v2 = decode_vlist(&bb.hits[fr.h2].vlist);
        if v1.is_empty() || v2.is_empty() {
            continue;
        }

        let path = if *v1.last().unwrap() >= v2[0] {
            merge_overlap(&v1, &v2)
        } else {
            search_gap(&v1, &v2, &transitions)
                .map(|mid| chain(&v1, &mid, &v2))
                .or_else(|| fill_contiguous(&v1, &v2, regions))
        };

        let Some((chain, ptype)) = path else { continue };
        let length =
            aligned_length(&chain, regions) - fr.k1l - fr.k2r;
        fr.paths = vec![FragmentPath {
            ptype,
            v: encode_vlist(&chain),
            length,
        }];
        let q = bb.hits[fr.h1].qname.clone();
        bb.hits[fr.h1].bridged = true;
        bb.hits[fr.h2].bridged = true;
        breads.insert(q);
    }
}

/// Support counts of observed region-to-region transitions among hits whose
/// fragment genotype does not conflict with the target.
fn build_transitions(
    bb: &BundleBase,
    fragments: &[Fragment],
    target: Genotype,
) -> HashMap<(i32, i32), i32> {
    let mut m: HashMap<(i32, i32), i32> = HashMap::new();
    for h in &bb.hits {
        let hgt = if h.fidx >= 0 {
            fragments[h.fidx as usize].gt
        } else {
            Genotype::Unphased
        };
        if gt_conflict(hgt, target) {
            continue;
        }
        let v = decode_vlist(&h.vlist);
        for w in v.windows(2) {
            *m.entry((w[0], w[1])).or_insert(0) += 1;
        }
    }
    m
}

/// Mates overlap in region space: accept when the shared indices agree.
fn merge_overlap(v1: &[i32], v2: &[i32]) -> Option<(Vec<i32>, i32)> {
    let s2 = v2[0];
    let k = v1.iter().position(|&x| x == s2)?;
    let shared = v1.len() - k;
    if shared > v2.len() || v1[k..] != v2[..shared] {
        return None;
    }
    let mut out = v1.to_vec();
    out.extend_from_slice(&v2[shared..]);
    Some((out, 1))
}

/// Widest-bottleneck path between the mates' facing regions, over observed
/// transitions. Regions only increase along transitions, so one ascending
/// sweep suffices.
fn search_gap(
    v1: &[i32],
    v2: &[i32],
    transitions: &HashMap<(i32, i32), i32>,
) -> Option<Vec<i32>> {
    let s = *v1.last().unwrap();
    let t = v2[0];
    if (t - s) as usize > MAX_BRIDGE_SPAN {
        return None;
    }

    // best[x] = (bottleneck, predecessor) for reaching region x from s
    let mut best: HashMap<i32, (i32, i32)> = HashMap::new();
    best.insert(s, (i32::MAX, s));
    for x in s..t {
        let Some(&(bx, _)) = best.get(&x) else { continue };
        for (&(a, b), &c) in transitions.iter() {
            if a != x || b > t {
                continue;
            }
            let w = bx.min(c);
            let improved = best.get(&b).map(|&(bb, _)| w > bb).unwrap_or(true);
            if improved {
                best.insert(b, (w, x));
            }
        }
    }

    best.get(&t)?;
    let mut mid = Vec::new();
    let mut cur = t;
    while cur != s {
        let (_, prev) = best[&cur];
        if cur != t {
            mid.push(cur);
        }
        cur = prev;
    }
    mid.reverse();
    Some(mid)
}

/// No junction evidence, but the gap is wall-to-wall covered non-allelic
/// sequence: fill it directly. These paths carry type 2 and feed the
/// false-boundary heuristics rather than full phasing confidence.
fn fill_contiguous(v1: &[i32], v2: &[i32], regions: &[Region]) -> Option<(Vec<i32>, i32)> {
    let s = *v1.last().unwrap();
    let t = v2[0];
    if (t - s) as usize > MAX_BRIDGE_SPAN {
        return None;
    }
    for x in s..t {
        let a = &regions[x as usize];
        let b = &regions[(x + 1) as usize];
        if b.is_allelic() || !a.rpos.same_coord(&b.lpos) {
            return None;
        }
        if x > s && regions[x as usize].ave <= 0.0 {
            return None;
        }
    }
    let mid: Vec<i32> = (s + 1..t).collect();
    Some((chain(v1, &mid, v2), 2))
}

fn chain(v1: &[i32], mid: &[i32], v2: &[i32]) -> Vec<i32> {
    let mut out = v1.to_vec();
    out.extend_from_slice(mid);
    out.extend_from_slice(v2);
    out
}

fn aligned_length(v: &[i32], regions: &[Region]) -> i32 {
    v.iter()
        .map(|&k| {
            let r = &regions[k as usize];
            r.rpos.p - r.lpos.p
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_merge_requires_agreement() {
        assert_eq!(
            merge_overlap(&[0, 1, 2], &[2, 3]),
            Some((vec![0, 1, 2, 3], 1))
        );
        assert_eq!(merge_overlap(&[0, 1, 2], &[1, 3]), None);
        assert_eq!(
            merge_overlap(&[0, 2], &[0, 2]),
            Some((vec![0, 2], 1))
        );
    }

    #[test]
    fn gap_search_follows_observed_transitions() {
        let mut tr: HashMap<(i32, i32), i32> = HashMap::new();
        tr.insert((1, 3), 5);
        tr.insert((3, 4), 5);
        tr.insert((1, 2), 1);
        tr.insert((2, 4), 1);
        let mid = search_gap(&[0, 1], &[4, 5], &tr).unwrap();
        assert_eq!(mid, vec![3]);
        assert!(search_gap(&[0, 1], &[9], &HashMap::new()).is_none());
    }
}
