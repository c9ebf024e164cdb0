//! データセットのディレクトリ構成
//!
//! `<root>/{train,validation,test}/{deer,background}/` の固定レイアウトを扱います。

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// 分類クラス
///
/// インデックスはクラスディレクトリ名のアルファベット順に一致する
/// (`background` = 0, `deer` = 1)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClassLabel {
    Background,
    Deer,
}

impl ClassLabel {
    /// インデックス順の全クラス
    pub const ALL: [ClassLabel; 2] = [ClassLabel::Background, ClassLabel::Deer];

    pub fn index(self) -> usize {
        match self {
            ClassLabel::Background => 0,
            ClassLabel::Deer => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// データセット内のディレクトリ名
    pub fn dir_name(self) -> &'static str {
        match self {
            ClassLabel::Background => "background",
            ClassLabel::Deer => "deer",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.dir_name() == name)
    }

    /// 確率からクラスを判定（`threshold` 以上で Deer）
    pub fn from_probability(probability: f32, threshold: f32) -> Self {
        if probability >= threshold {
            ClassLabel::Deer
        } else {
            ClassLabel::Background
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Background => write!(f, "Background"),
            ClassLabel::Deer => write!(f, "Deer"),
        }
    }
}

/// データセットの分割
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    /// 切り出し順（train → validation → test）
    pub const ALL: [Split; 3] = [Split::Train, Split::Validation, Split::Test];

    pub fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "validation",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// 出力先ルート配下のレイアウト
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split_dir(&self, split: Split) -> PathBuf {
        self.root.join(split.dir_name())
    }

    /// 末端ディレクトリ `<root>/<split>/<class>`
    pub fn leaf(&self, split: Split, class: ClassLabel) -> PathBuf {
        self.split_dir(split).join(class.dir_name())
    }

    /// すべての末端ディレクトリを作成（既存なら何もしない）
    pub fn create_all(&self) -> Result<()> {
        for split in Split::ALL {
            for class in ClassLabel::ALL {
                let dir = self.leaf(split, class);
                std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
            }
        }
        Ok(())
    }
}
