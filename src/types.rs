//! パイプライン全体で共有するデータモデル

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 検索結果1件分のスニペット
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSnippet {
    pub title: String,
    pub link: String,
    pub description: String,
}

impl SearchSnippet {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: description.into(),
        }
    }

    /// プロンプトに埋め込む1行サマリー
    pub fn summary_line(&self) -> String {
        format!(
            "Title: {} | Desc: {} | Link: {}",
            self.title, self.description, self.link
        )
    }
}

/// LLMが生成した記事（タイトルと本文）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub body: String,
}

/// ローカルに保存した生成画像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// 保存先（固定パスのため実行ごとに上書きされる）
    pub path: PathBuf,
    /// 画像サービスに送ったプロンプト
    pub prompt: Outcome<String>,
}

/// WordPressメディアライブラリ上の画像ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub id: u64,
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// 公開済み投稿（ログ出力用にIDのみ保持）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: u64,
    #[serde(default)]
    pub link: Option<String>,
}

/// 生成結果。フォールバック値で代替した場合はその理由を保持する
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// 外部サービスから得た実際の値
    Generated(T),
    /// 失敗時に差し替えた既定値
    Fallback { value: T, reason: String },
}

impl<T> Outcome<T> {
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Outcome::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Generated(value) | Outcome::Fallback { value, .. } => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Generated(value) | Outcome::Fallback { value, .. } => value,
        }
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Outcome::Generated(_) => None,
            Outcome::Fallback { reason, .. } => Some(reason),
        }
    }
}
