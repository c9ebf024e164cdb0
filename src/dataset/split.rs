//! 分割比率とサイズ計算

use std::ops::Range;
use std::str::FromStr;

use crate::dataset::layout::Split;
use crate::error::Error;

/// train/validation/test の百分率（合計100である必要はない）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPercentages {
    pub train: u32,
    pub validation: u32,
    pub test: u32,
}

impl Default for SplitPercentages {
    fn default() -> Self {
        Self {
            train: 70,
            validation: 20,
            test: 10,
        }
    }
}

impl SplitPercentages {
    /// 合計（`u32` の上限を超える入力でもあふれない）
    pub fn total(&self) -> u64 {
        self.train as u64 + self.validation as u64 + self.test as u64
    }

    pub fn get(&self, split: Split) -> u32 {
        match split {
            Split::Train => self.train,
            Split::Validation => self.validation,
            Split::Test => self.test,
        }
    }
}

impl FromStr for SplitPercentages {
    type Err = Error;

    /// `"70,20,10"` 形式を解析
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim().parse::<u32>().map_err(|e| {
                    Error::MalformedConfig(format!("invalid percentage '{}' in '{}': {}", part, s, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match values.as_slice() {
            [train, validation, test] => Ok(Self {
                train: *train,
                validation: *validation,
                test: *test,
            }),
            _ => Err(Error::MalformedConfig(format!(
                "expected three comma-separated percentages (train,val,test), got '{}'",
                s
            ))),
        }
    }
}

/// 各分割に割り当てる枚数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPlan {
    pub train: usize,
    pub validation: usize,
    pub test: usize,
}

impl SplitPlan {
    /// 小さい方のクラス枚数を基準にサイズを決定
    ///
    /// 各サイズは `floor(min(counts) * pct / 100)`。端数は切り捨てられ、どの分割にも入らない。
    pub fn from_counts(percentages: &SplitPercentages, counts: &[usize]) -> Self {
        let basis = counts.iter().copied().min().unwrap_or(0);
        Self {
            train: Self::size_for(basis, percentages.train),
            validation: Self::size_for(basis, percentages.validation),
            test: Self::size_for(basis, percentages.test),
        }
    }

    fn size_for(basis: usize, percentage: u32) -> usize {
        (basis as u64 * percentage as u64 / 100) as usize
    }

    pub fn get(&self, split: Split) -> usize {
        match split {
            Split::Train => self.train,
            Split::Validation => self.validation,
            Split::Test => self.test,
        }
    }

    pub fn total(&self) -> usize {
        self.train + self.validation + self.test
    }

    /// シャッフル済みリスト上の連続範囲（長さ `len` でクランプ）
    pub fn ranges(&self, len: usize) -> [(Split, Range<usize>); 3] {
        let mut offset = 0usize;
        Split::ALL.map(|split| {
            let start = offset.min(len);
            let end = offset.saturating_add(self.get(split)).min(len);
            offset = offset.saturating_add(self.get(split));
            (split, start..end)
        })
    }

    /// リストを3つの重複しないスライスに分ける
    pub fn partition<'a, T>(&self, items: &'a [T]) -> [(Split, &'a [T]); 3] {
        self.ranges(items.len())
            .map(|(split, range)| (split, &items[range]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_string() {
        let pct: SplitPercentages = "70,20,10".parse().unwrap();
        assert_eq!(pct, SplitPercentages::default());
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let pct: SplitPercentages = " 60 , 30,10 ".parse().unwrap();
        assert_eq!((pct.train, pct.validation, pct.test), (60, 30, 10));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(matches!(
            "70,twenty,10".parse::<SplitPercentages>(),
            Err(Error::MalformedConfig(_))
        ));
        assert!(matches!(
            "-70,20,10".parse::<SplitPercentages>(),
            Err(Error::MalformedConfig(_))
        ));
    }

    #[test]
    fn test_total_does_not_overflow() {
        let pct: SplitPercentages = "4294967295,1,0".parse().unwrap();
        assert_eq!(pct.total(), u32::MAX as u64 + 1);

        let plan = SplitPlan::from_counts(&pct, &[10, 10]);
        assert_eq!(plan.train, 10 * u32::MAX as usize / 100);
        let items: Vec<u32> = (0..10).collect();
        let [(_, train), (_, val), (_, test)] = plan.partition(&items);
        assert_eq!((train.len(), val.len(), test.len()), (10, 0, 0));
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        assert!("70,30".parse::<SplitPercentages>().is_err());
        assert!("70,20,5,5".parse::<SplitPercentages>().is_err());
    }

    #[test]
    fn test_plan_uses_smaller_class_and_truncates() {
        let plan = SplitPlan::from_counts(&SplitPercentages::default(), &[57, 123]);
        // 57 * 0.7 = 39.9, 57 * 0.2 = 11.4, 57 * 0.1 = 5.7
        assert_eq!(plan, SplitPlan { train: 39, validation: 11, test: 5 });
        assert!(plan.total() <= 57);
    }

    #[test]
    fn test_plan_sum_never_exceeds_basis_when_percentages_fit() {
        let triples = [(70, 20, 10), (33, 33, 34), (100, 0, 0), (0, 0, 0), (50, 25, 25), (99, 1, 0)];
        for (a, b, c) in triples {
            let pct = SplitPercentages { train: a, validation: b, test: c };
            for m in [0usize, 1, 2, 7, 10, 99, 101, 1000] {
                for n in [0usize, 3, 50, 1000] {
                    let plan = SplitPlan::from_counts(&pct, &[m, n]);
                    let basis = m.min(n);
                    assert!(plan.total() <= basis);
                    assert_eq!(plan.train, basis * a as usize / 100);
                    assert_eq!(plan.validation, basis * b as usize / 100);
                    assert_eq!(plan.test, basis * c as usize / 100);
                }
            }
        }
    }

    #[test]
    fn test_partition_is_disjoint_and_ordered() {
        let items: Vec<u32> = (0..10).collect();
        let plan = SplitPlan { train: 5, validation: 3, test: 1 };
        let [(_, train), (_, val), (_, test)] = plan.partition(&items);
        assert_eq!(train, &[0, 1, 2, 3, 4]);
        assert_eq!(val, &[5, 6, 7]);
        assert_eq!(test, &[8]);
    }

    #[test]
    fn test_partition_clamps_when_over_100_percent() {
        let pct = SplitPercentages { train: 80, validation: 30, test: 20 };
        let plan = SplitPlan::from_counts(&pct, &[10, 10]);
        assert_eq!(plan.total(), 13);

        let items: Vec<u32> = (0..10).collect();
        let [(_, train), (_, val), (_, test)] = plan.partition(&items);
        assert_eq!(train.len(), 8);
        assert_eq!(val, &[8, 9]);
        assert!(test.is_empty());
    }

    #[test]
    fn test_partition_of_larger_class_leaves_remainder() {
        let plan = SplitPlan::from_counts(&SplitPercentages::default(), &[10, 20]);
        let items: Vec<u32> = (0..20).collect();
        let selected: usize = plan.partition(&items).iter().map(|(_, s)| s.len()).sum();
        assert_eq!(selected, 10);
    }
}
