use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::types::TextBlock;

/// Minimum sizes for each heading tier. Always ordered `h1 >= h2 >= h3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadingThresholds {
    pub h1: f32,
    pub h2: f32,
    pub h3: f32,
}

/// Which threshold formula was applied to the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeRegime {
    /// Few rounded sizes and a narrow range (flyers, invitations, forms).
    Simple,
    /// Rich typography: many sizes and a wide range.
    Complex,
    Standard,
    /// Fewer than four distinct sizes; median multiples only.
    Limited,
    /// No sized text at all.
    Empty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Percentiles {
    pub p25: f32,
    pub p50: f32,
    pub p75: f32,
    pub p90: f32,
    pub p95: f32,
}

/// Corpus-wide font-size distribution for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontStatistics {
    pub mean: f32,
    pub median: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
    pub percentiles: Percentiles,
    pub regime: SizeRegime,
    pub heading_thresholds: HeadingThresholds,
    /// Lower bound for the H3 size tier of the confidence scorer.
    pub scoring_floor: f32,
    /// Block count per full font name.
    pub common_fonts: BTreeMap<String, usize>,
    /// Block count per font family (name up to the first `-` or space).
    pub font_families: BTreeMap<String, usize>,
    /// Block count per font name, for bold runs only.
    pub bold_fonts: BTreeMap<String, usize>,
}

impl FontStatistics {
    /// Statistics for a document that carries no sized text.
    pub fn fallback() -> Self {
        FontStatistics {
            mean: 12.0,
            median: 12.0,
            std: 1.0,
            min: 12.0,
            max: 12.0,
            percentiles: Percentiles {
                p25: 12.0,
                p50: 12.0,
                p75: 12.0,
                p90: 12.0,
                p95: 12.0,
            },
            regime: SizeRegime::Empty,
            heading_thresholds: HeadingThresholds {
                h1: 16.0,
                h2: 14.0,
                h3: 12.0,
            },
            scoring_floor: scoring_floor(12.0),
            common_fonts: BTreeMap::new(),
            font_families: BTreeMap::new(),
            bold_fonts: BTreeMap::new(),
        }
    }

    /// `size / median`, or 1.0 when the median is degenerate.
    pub fn size_ratio(&self, size: f32) -> f32 {
        if self.median > 0.0 {
            size / self.median
        } else {
            1.0
        }
    }

    /// The `n` most frequent font names, most frequent first.
    pub fn dominant_fonts(&self, n: usize) -> Vec<(String, usize)> {
        let mut fonts: Vec<(String, usize)> = self
            .common_fonts
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        fonts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        fonts.truncate(n);
        fonts
    }
}

/// Compute font statistics over every block with a positive size.
pub fn analyze_font_statistics(blocks: &[TextBlock]) -> FontStatistics {
    let mut sizes: Vec<f32> = blocks
        .iter()
        .map(|b| b.font_size)
        .filter(|s| *s > 0.0 && s.is_finite())
        .collect();

    if sizes.is_empty() {
        return FontStatistics::fallback();
    }

    sizes.sort_by(f32::total_cmp);

    let n = sizes.len() as f64;
    let mean = (sizes.iter().map(|s| *s as f64).sum::<f64>() / n) as f32;
    let variance = sizes
        .iter()
        .map(|s| (*s as f64 - mean as f64).powi(2))
        .sum::<f64>()
        / n;
    let std = variance.sqrt() as f32;
    let min = sizes[0];
    let max = sizes[sizes.len() - 1];
    let median = percentile(&sizes, 50.0);

    let percentiles = Percentiles {
        p25: percentile(&sizes, 25.0),
        p50: median,
        p75: percentile(&sizes, 75.0),
        p90: percentile(&sizes, 90.0),
        p95: percentile(&sizes, 95.0),
    };

    let distinct_raw: BTreeSet<u32> = sizes.iter().map(|s| s.to_bits()).collect();
    let variety: BTreeSet<i64> = sizes.iter().map(|s| s.round() as i64).collect();
    let range = max - min;

    let (regime, heading_thresholds) = if distinct_raw.len() >= 4 {
        let p = &percentiles;
        if variety.len() <= 3 && range < 6.0 {
            (
                SizeRegime::Simple,
                HeadingThresholds {
                    h1: p.p75.max(median * 1.3),
                    h2: p.p50.max(median * 1.15),
                    h3: median * 1.05,
                },
            )
        } else if variety.len() >= 5 && range > 10.0 {
            (
                SizeRegime::Complex,
                HeadingThresholds {
                    h1: p.p95.max(median * 1.8),
                    h2: p.p90.max(median * 1.5),
                    h3: p.p75.max(median * 1.3),
                },
            )
        } else {
            (
                SizeRegime::Standard,
                HeadingThresholds {
                    h1: p.p90.max(median * 1.6),
                    h2: p.p75.max(median * 1.4),
                    h3: p.p50.max(median * 1.2),
                },
            )
        }
    } else {
        (
            SizeRegime::Limited,
            HeadingThresholds {
                h1: median * 1.5,
                h2: median * 1.3,
                h3: median * 1.1,
            },
        )
    };

    let mut common_fonts = BTreeMap::new();
    let mut font_families = BTreeMap::new();
    let mut bold_fonts = BTreeMap::new();
    for block in blocks {
        *common_fonts.entry(block.font_name.clone()).or_insert(0) += 1;
        *font_families
            .entry(font_family(&block.font_name).to_string())
            .or_insert(0) += 1;
        if block.has_bold_flag() || block.font_name.to_lowercase().contains("bold") {
            *bold_fonts.entry(block.font_name.clone()).or_insert(0) += 1;
        }
    }

    log::debug!(
        "font statistics: median {median:.2}, mean {mean:.2}, {} distinct sizes, regime {regime:?}",
        distinct_raw.len()
    );

    FontStatistics {
        mean,
        median,
        std,
        min,
        max,
        percentiles,
        regime,
        heading_thresholds,
        scoring_floor: scoring_floor(mean),
        common_fonts,
        font_families,
        bold_fonts,
    }
}

/// Font family: the name up to the first `-`, then up to the first space.
pub fn font_family(font_name: &str) -> &str {
    let head = font_name.split('-').next().unwrap_or(font_name);
    head.split(' ').next().unwrap_or(head)
}

fn scoring_floor(mean: f32) -> f32 {
    if mean > 12.0 {
        (mean * 0.85).max(8.0)
    } else {
        (mean * 0.8).max(7.5)
    }
}

/// Linear-interpolated percentile over an ascending, non-empty slice.
fn percentile(sorted: &[f32], pct: f32) -> f32 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (pct as f64 / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    let lo = sorted[lower] as f64;
    let hi = sorted[upper] as f64;
    (lo + (hi - lo) * frac) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BBox;

    fn make_block(size: f32) -> TextBlock {
        TextBlock {
            text: "text".to_string(),
            font_name: "Helvetica".to_string(),
            font_size: size,
            font_flags: 0,
            bbox: BBox::default(),
            page: 0,
        }
    }

    fn blocks_of(sizes: &[f32]) -> Vec<TextBlock> {
        sizes.iter().map(|s| make_block(*s)).collect()
    }

    #[test]
    fn test_empty_corpus_falls_back() {
        let stats = analyze_font_statistics(&[]);
        assert_eq!(stats.mean, 12.0);
        assert_eq!(stats.heading_thresholds.h1, 16.0);
        assert_eq!(stats.heading_thresholds.h2, 14.0);
        assert_eq!(stats.heading_thresholds.h3, 12.0);
        assert_eq!(stats.regime, SizeRegime::Empty);
    }

    #[test]
    fn test_zero_sizes_ignored() {
        let stats = analyze_font_statistics(&blocks_of(&[0.0, 0.0]));
        assert_eq!(stats.regime, SizeRegime::Empty);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [10.0, 12.0, 14.0, 16.0];
        assert!((percentile(&sorted, 50.0) - 13.0).abs() < 1e-5);
        assert!((percentile(&sorted, 25.0) - 11.5).abs() < 1e-5);
        assert!((percentile(&sorted, 95.0) - 15.7).abs() < 1e-4);
    }

    #[test]
    fn test_limited_variety_uses_median_multiples() {
        let stats = analyze_font_statistics(&blocks_of(&[12.0, 12.0, 12.0, 24.0]));
        assert_eq!(stats.regime, SizeRegime::Limited);
        assert!((stats.heading_thresholds.h1 - 18.0).abs() < 1e-4);
        assert!((stats.heading_thresholds.h2 - 15.6).abs() < 1e-4);
        assert!((stats.heading_thresholds.h3 - 13.2).abs() < 1e-4);
    }

    #[test]
    fn test_simple_regime() {
        // Four raw sizes that round to three values within a 2pt range.
        let stats = analyze_font_statistics(&blocks_of(&[10.0, 10.2, 11.0, 12.0, 10.0, 10.0]));
        assert_eq!(stats.regime, SizeRegime::Simple);
        let median = stats.median;
        assert!((stats.heading_thresholds.h3 - median * 1.05).abs() < 1e-4);
    }

    #[test]
    fn test_complex_regime() {
        let stats = analyze_font_statistics(&blocks_of(&[
            9.0, 10.0, 10.0, 10.0, 10.0, 12.0, 14.0, 18.0, 24.0,
        ]));
        assert_eq!(stats.regime, SizeRegime::Complex);
        assert!(stats.heading_thresholds.h1 >= stats.median * 1.8);
    }

    #[test]
    fn test_standard_regime() {
        let stats = analyze_font_statistics(&blocks_of(&[10.0, 10.0, 11.0, 13.0, 16.0]));
        assert_eq!(stats.regime, SizeRegime::Standard);
    }

    #[test]
    fn test_thresholds_are_ordered() {
        let corpora: Vec<Vec<f32>> = vec![
            vec![12.0],
            vec![8.0, 8.0, 30.0],
            vec![10.0, 10.2, 11.0, 12.0],
            vec![9.0, 10.0, 12.0, 14.0, 18.0, 24.0, 36.0],
            vec![10.0, 10.0, 11.0, 13.0, 16.0],
            vec![72.0, 6.0, 6.5, 7.0, 7.5],
            vec![11.0; 40],
        ];
        for sizes in corpora {
            let t = analyze_font_statistics(&blocks_of(&sizes)).heading_thresholds;
            assert!(t.h1 >= t.h2, "h1 < h2 for {sizes:?}");
            assert!(t.h2 >= t.h3, "h2 < h3 for {sizes:?}");
        }
    }

    #[test]
    fn test_scoring_floor() {
        let small = analyze_font_statistics(&blocks_of(&[10.0, 10.0]));
        assert!((small.scoring_floor - 8.0).abs() < 1e-5);
        let large = analyze_font_statistics(&blocks_of(&[20.0, 20.0]));
        assert!((large.scoring_floor - 17.0).abs() < 1e-5);
    }

    #[test]
    fn test_population_std() {
        let stats = analyze_font_statistics(&blocks_of(&[10.0, 14.0]));
        assert!((stats.std - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_font_histograms() {
        let mut blocks = blocks_of(&[12.0, 12.0, 18.0]);
        blocks[2].font_name = "Arial-BoldMT".to_string();
        blocks[1].font_name = "Times New Roman".to_string();
        let stats = analyze_font_statistics(&blocks);
        assert_eq!(stats.font_families.get("Arial"), Some(&1));
        assert_eq!(stats.font_families.get("Times"), Some(&1));
        assert_eq!(stats.bold_fonts.get("Arial-BoldMT"), Some(&1));
        assert_eq!(stats.dominant_fonts(1).len(), 1);
    }
}
