// Phase 2: ページモデル: SourceDocument / Page / PageStream
//
// A PageStream is an ordered list of page handles. Each handle points into
// the loaded source document it came from, so transforms only shuffle
// handles and never copy PDF objects. Objects are imported into a fresh
// document only when the stream is assembled by the writer.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId};
use sha2::{Digest, Sha256};

use crate::error::PdfMixError;

/// ページツリーの親から継承されうるページ属性。
pub(crate) const INHERITABLE_KEYS: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// 読み込み済みのPDF文書。ラベルはログとエラーメッセージ用。
#[derive(Debug)]
pub struct SourceDocument {
    label: String,
    doc: Document,
}

impl SourceDocument {
    pub fn new(label: impl Into<String>, doc: Document) -> Self {
        Self {
            label: label.into(),
            doc,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

/// 回転操作の角度（時計回り）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }
}

impl TryFrom<i64> for Rotation {
    type Error = PdfMixError;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        match degrees {
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(PdfMixError::validation(format!(
                "rotation must be 90, 180 or 270 degrees, got {other}"
            ))),
        }
    }
}

/// 任意の `/Rotate` 値を 0/90/180/270 に正規化する。
///
/// 90の倍数でない値は最も近い四分の一回転に丸める。
pub fn normalize_rotation(degrees: i64) -> u16 {
    // 先に1周に縮めるので、巨大な値でも乗算が溢れない
    let reduced = degrees.rem_euclid(360);
    let snapped = (reduced as f64 / 90.0).round() as i64 * 90;
    (snapped % 360) as u16
}

/// PageStream内の1ページ。元文書のページオブジェクトへのハンドルと回転状態を持つ。
#[derive(Clone)]
pub struct Page {
    source: Arc<SourceDocument>,
    object_id: ObjectId,
    position: u32,
    rotation: u16,
}

impl Page {
    /// 元文書のオブジェクトを指すページハンドルを作る。回転は任意の値を正規化する。
    pub fn new(
        source: Arc<SourceDocument>,
        object_id: ObjectId,
        position: u32,
        rotation: i64,
    ) -> Self {
        Self {
            source,
            object_id,
            position,
            rotation: normalize_rotation(rotation),
        }
    }

    pub fn source(&self) -> &Arc<SourceDocument> {
        &self.source
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// 元文書でのページ番号（1-based）。
    pub fn source_position(&self) -> u32 {
        self.position
    }

    /// 現在の回転（0/90/180/270）。
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    /// 回転を加算した新しいページを返す（360で剰余）。
    pub fn rotated(&self, rotation: Rotation) -> Page {
        Page {
            rotation: (self.rotation + rotation.degrees()) % 360,
            ..self.clone()
        }
    }

    /// ページ辞書を返す。
    pub fn dictionary(&self) -> crate::error::Result<&Dictionary> {
        self.source
            .doc
            .get_dictionary(self.object_id)
            .map_err(|e| {
                PdfMixError::input(format!(
                    "{}: page {} is not a dictionary: {e}",
                    self.source.label, self.position
                ))
            })
    }

    /// ページ属性を取得する（Parent経由の継承も考慮）。
    pub fn inherited_attribute(&self, key: &[u8]) -> Option<&Object> {
        let doc = &self.source.doc;
        let mut dict = doc.get_dictionary(self.object_id).ok()?;
        let mut visited = HashSet::new();
        visited.insert(self.object_id);

        loop {
            if let Ok(obj) = dict.get(key) {
                return Some(obj);
            }
            let parent_id = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
            // Malformed trees can loop back on themselves.
            if !visited.insert(parent_id) {
                return None;
            }
            dict = doc.get_dictionary(parent_id).ok()?;
        }
    }

    /// MediaBoxからページ寸法 (width_pts, height_pts) を返す。回転は考慮しない。
    pub fn media_box_size(&self) -> Option<(f64, f64)> {
        let media_box = self.inherited_attribute(b"MediaBox")?;
        let media_box = match media_box {
            Object::Reference(id) => self.source.doc.get_object(*id).ok()?,
            other => other,
        };
        let values = media_box.as_array().ok()?;
        if values.len() < 4 {
            return None;
        }

        let to_f64 = |obj: &Object| -> Option<f64> {
            match obj {
                Object::Integer(i) => Some(*i as f64),
                Object::Real(f) => Some(f64::from(*f)),
                _ => None,
            }
        };

        let width = (to_f64(&values[2])? - to_f64(&values[0])?).abs();
        let height = (to_f64(&values[3])? - to_f64(&values[1])?).abs();
        Some((width, height))
    }

    /// 表示上（回転適用後）に縦長かどうか。
    pub fn is_portrait(&self) -> bool {
        let Some((width, height)) = self.media_box_size() else {
            return false;
        };
        if self.rotation % 180 == 0 {
            height > width
        } else {
            width > height
        }
    }

    /// ページのコンテンツストリームを（デコード済みで）返す。
    pub fn content(&self) -> crate::error::Result<Vec<u8>> {
        self.source
            .doc
            .get_page_content(self.object_id)
            .map_err(|e| {
                PdfMixError::input(format!(
                    "{}: cannot read content of page {}: {e}",
                    self.source.label, self.position
                ))
            })
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
            && self.object_id == other.object_id
            && self.rotation == other.rotation
    }
}

impl Eq for Page {}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}@{}",
            self.source.label, self.position, self.rotation
        )
    }
}

/// 順序付きのページ列。生成後は変更されず、変換は常に新しいPageStreamを返す。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageStream {
    pages: Vec<Page>,
}

impl PageStream {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    /// 文書の全ページからPageStreamを作る。初期回転は継承込みの `/Rotate`。
    pub fn from_document(label: impl Into<String>, doc: Document) -> Self {
        let source = Arc::new(SourceDocument::new(label, doc));
        let page_ids: Vec<(u32, ObjectId)> = source.doc.get_pages().into_iter().collect();

        let pages = page_ids
            .into_iter()
            .map(|(position, object_id)| {
                let mut page = Page::new(Arc::clone(&source), object_id, position, 0);
                page.rotation = page
                    .inherited_attribute(b"Rotate")
                    .and_then(|obj| obj.as_i64().ok())
                    .map(normalize_rotation)
                    .unwrap_or(0);
                page
            })
            .collect();

        Self { pages }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// ページ数（u32）。ページ範囲のパースに使う。
    pub fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    /// 1-basedの位置でページを取得する。範囲外は `None`。
    pub fn get(&self, position: u32) -> Option<&Page> {
        let index = usize::try_from(position).ok()?.checked_sub(1)?;
        self.pages.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Page> {
        self.pages.iter()
    }

    /// 各ページの内容ハッシュ（SHA-256 hex）を返す。
    ///
    /// ハッシュ入力: `decoded_content || rotation`。オブジェクト番号には依存しない。
    pub fn content_fingerprint(&self) -> crate::error::Result<Vec<String>> {
        self.pages
            .iter()
            .map(|page| {
                let mut hasher = Sha256::new();
                hasher.update(page.content()?);
                hasher.update(page.rotation.to_le_bytes());
                Ok(hex::encode(hasher.finalize()))
            })
            .collect()
    }

    /// ストリーム全体の内容ハッシュ（ページごとのハッシュをさらにハッシュしたもの）。
    pub fn digest(&self) -> crate::error::Result<String> {
        let mut hasher = Sha256::new();
        for page_hash in self.content_fingerprint()? {
            hasher.update(page_hash.as_bytes());
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

impl FromIterator<Page> for PageStream {
    fn from_iter<I: IntoIterator<Item = Page>>(iter: I) -> Self {
        Self {
            pages: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PageStream {
    type Item = &'a Page;
    type IntoIter = std::slice::Iter<'a, Page>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}
