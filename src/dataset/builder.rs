//! ソース画像からデータセットを構築
//!
//! 2つのクラスディレクトリを走査し、小さい方の枚数を基準に分割サイズを決め、
//! シャッフル後に train/validation/test へコピーします。

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::dataset::layout::{ClassLabel, DatasetLayout, Split};
use crate::dataset::split::{SplitPercentages, SplitPlan};
use crate::error::{Error, Result};

/// ディレクトリ内のファイル一覧を取得（パス順）
///
/// 拡張子や画像としての妥当性は確認しない。サブディレクトリと `.` で始まる隠しファイルは除外し、
/// 分割サイズの基準となる枚数にも含めない。
pub fn collect_source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();

        if path.is_dir() {
            continue;
        }
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden {
            files.push(path);
        }
    }

    // read_dirの順序はOS依存のため、シード固定時の再現性を保つためにソート
    files.sort();
    Ok(files)
}

/// 1クラス分のソース
#[derive(Debug, Clone)]
pub struct ClassSource {
    pub class: ClassLabel,
    pub dir: PathBuf,
}

/// 分割ごとのコピー結果
#[derive(Debug, Clone)]
pub struct CopiedSplit {
    pub split: Split,
    pub class: ClassLabel,
    /// コピー元ファイル
    pub sources: Vec<PathBuf>,
    /// コピー先ファイル
    pub destinations: Vec<PathBuf>,
}

/// データセット構築結果
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub plan: SplitPlan,
    pub copied: Vec<CopiedSplit>,
}

impl BuildSummary {
    pub fn get(&self, split: Split, class: ClassLabel) -> Option<&CopiedSplit> {
        self.copied.iter().find(|c| c.split == split && c.class == class)
    }

    /// 結果をコンソールに表示
    pub fn print(&self) {
        println!(
            "{} {} {}",
            self.plan.train, self.plan.validation, self.plan.test
        );
        for copied in &self.copied {
            println!(
                "  {}/{}: {} files",
                copied.split,
                copied.class.dir_name(),
                copied.destinations.len()
            );
        }
    }
}

/// データセットビルダー
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    layout: DatasetLayout,
    sources: Vec<ClassSource>,
}

impl DatasetBuilder {
    pub fn new(layout: DatasetLayout) -> Self {
        Self {
            layout,
            sources: Vec::new(),
        }
    }

    /// クラスのソースディレクトリを追加
    pub fn source<P: AsRef<Path>>(mut self, class: ClassLabel, dir: P) -> Self {
        self.sources.push(ClassSource {
            class,
            dir: dir.as_ref().to_path_buf(),
        });
        self
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    /// データセットを構築
    ///
    /// 出力ディレクトリを作る前にすべてのソースを走査するため、ソースが欠けている場合は何も作成されない。
    pub fn build<R: Rng + ?Sized>(
        &self,
        percentages: &SplitPercentages,
        rng: &mut R,
    ) -> Result<BuildSummary> {
        if percentages.total() > 100 {
            warn!(
                "split percentages sum to {} (> 100); trailing splits will be truncated",
                percentages.total()
            );
        }

        let mut collections = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let files = collect_source_files(&source.dir)?;
            info!(
                "{}: {} files in {}",
                source.class,
                files.len(),
                source.dir.display()
            );
            collections.push((source, files));
        }

        let counts: Vec<usize> = collections.iter().map(|(_, files)| files.len()).collect();
        let plan = SplitPlan::from_counts(percentages, &counts);
        info!(
            "split plan: train={}, validation={}, test={}",
            plan.train, plan.validation, plan.test
        );

        self.layout.create_all()?;

        let mut copied = Vec::new();
        for (source, mut files) in collections {
            files.shuffle(rng);

            for (split, selected) in plan.partition(&files) {
                let dest_dir = self.layout.leaf(split, source.class);
                let mut destinations = Vec::with_capacity(selected.len());

                for file in selected {
                    let dest = copy_into(file, &dest_dir)?;
                    destinations.push(dest);
                }
                debug!(
                    "copied {} files into {}",
                    destinations.len(),
                    dest_dir.display()
                );

                copied.push(CopiedSplit {
                    split,
                    class: source.class,
                    sources: selected.to_vec(),
                    destinations,
                });
            }
        }

        Ok(BuildSummary { plan, copied })
    }
}

/// ファイル名を保ったままコピー（同名ファイルは上書き）
fn copy_into(file: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = file
        .file_name()
        .ok_or_else(|| Error::MalformedConfig(format!("no file name in {}", file.display())))?;
    let dest = dest_dir.join(file_name);
    std::fs::copy(file, &dest).map_err(|e| Error::io(file, e))?;
    Ok(dest)
}
