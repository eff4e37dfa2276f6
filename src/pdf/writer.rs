// Phase 4: PageStream → 新規PDF文書の組立
//
// Every page of the stream is copied into a fresh document. Objects reachable
// from a page are imported once per source document with new object ids;
// references back into the source page tree (Parent, annotation /P, link
// destinations) are cut to null so the old tree and catalog never follow.

use std::collections::HashMap;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};

use crate::pdf::page::{INHERITABLE_KEYS, Page, PageStream, SourceDocument};

/// メタデータとして扱うエントリ名。サニタイズ時にコピーしない。
pub const METADATA_KEYS: &[&[u8]] = &[b"Metadata", b"PieceInfo", b"LastModified"];

/// MediaBoxが見つからないページに使う既定値（Letter）。
const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// ソース文書ごとのオブジェクトID対応表のキー。
type SourceKey = usize;

fn source_key(source: &Arc<SourceDocument>) -> SourceKey {
    Arc::as_ptr(source) as usize
}

/// PageStreamからPDF文書を組み立てる。
pub struct PdfPageWriter {
    doc: Document,
    imported: HashMap<(SourceKey, ObjectId), ObjectId>,
    strip_metadata: bool,
    stripped_entries: usize,
}

impl Default for PdfPageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfPageWriter {
    pub fn new() -> Self {
        Self {
            doc: Document::with_version("1.7"),
            imported: HashMap::new(),
            strip_metadata: false,
            stripped_entries: 0,
        }
    }

    /// コピー時に [`METADATA_KEYS`] のエントリを落とすWriterを作る。
    pub fn with_metadata_stripping() -> Self {
        Self {
            strip_metadata: true,
            ..Self::new()
        }
    }

    /// コピー時に落としたメタデータエントリの数。
    pub fn stripped_entries(&self) -> usize {
        self.stripped_entries
    }

    /// ページ列をページツリーとして書き込み、Catalogを設定する。
    ///
    /// 戻り値は新しい文書でのページオブジェクトID（ページ順）。
    pub fn write_pages(&mut self, stream: &PageStream) -> crate::error::Result<Vec<ObjectId>> {
        let pages_id = self.doc.new_object_id();

        let mut page_ids = Vec::with_capacity(stream.len());
        for page in stream {
            page_ids.push(self.write_page(page, pages_id)?);
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
            "Count" => page_ids.len() as i64,
        };
        self.doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        Ok(page_ids)
    }

    /// 1ページを新しい文書へコピーする。同じページが複数回現れても毎回別のページ辞書になる。
    fn write_page(&mut self, page: &Page, pages_id: ObjectId) -> crate::error::Result<ObjectId> {
        let source = Arc::clone(page.source());
        let key = source_key(&source);
        let source_doc = source.document();
        let source_dict = page.dictionary()?;
        let mut pending = Vec::new();

        let mut dict = Dictionary::new();
        for (name, value) in source_dict.iter() {
            if name.as_slice() == b"Parent" || name.as_slice() == b"Rotate" {
                continue;
            }
            if self.is_stripped(name) {
                continue;
            }
            let value = self.remap(key, source_doc, value, &mut pending);
            dict.set(name.clone(), value);
        }

        // The page leaves its original tree, so inherited attributes move onto it.
        for &name in INHERITABLE_KEYS {
            if name == b"Rotate" || dict.has(name) {
                continue;
            }
            if let Some(value) = page.inherited_attribute(name) {
                let value = self.remap(key, source_doc, value, &mut pending);
                dict.set(name.to_vec(), value);
            }
        }
        if !dict.has(b"MediaBox") {
            dict.set(
                "MediaBox",
                DEFAULT_MEDIA_BOX
                    .iter()
                    .map(|&v| Object::Integer(v))
                    .collect::<Vec<_>>(),
            );
        }

        dict.set("Type", "Page");
        dict.set("Parent", pages_id);
        if page.rotation() != 0 {
            dict.set("Rotate", i64::from(page.rotation()));
        }

        self.drain_pending(key, source_doc, &mut pending);
        Ok(self.doc.add_object(dict))
    }

    fn is_stripped(&mut self, name: &[u8]) -> bool {
        if self.strip_metadata && METADATA_KEYS.contains(&name) {
            self.stripped_entries += 1;
            true
        } else {
            false
        }
    }

    /// 取り込み待ちのオブジェクトを順にコピーする。コピー中に見つかった参照も同じキューへ積まれる。
    fn drain_pending(&mut self, key: SourceKey, source_doc: &Document, pending: &mut Vec<ObjectId>) {
        while let Some(old_id) = pending.pop() {
            let Some(&new_id) = self.imported.get(&(key, old_id)) else {
                continue;
            };
            let Ok(object) = source_doc.get_object(old_id) else {
                continue;
            };
            let copied = self.remap(key, source_doc, object, pending);
            self.doc.objects.insert(new_id, copied);
        }
    }

    /// オブジェクト内の参照を新しいIDに置き換えたコピーを返す。
    fn remap(
        &mut self,
        key: SourceKey,
        source_doc: &Document,
        object: &Object,
        pending: &mut Vec<ObjectId>,
    ) -> Object {
        match object {
            Object::Reference(id) => match self.import_reference(key, source_doc, *id, pending) {
                Some(new_id) => Object::Reference(new_id),
                None => Object::Null,
            },
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.remap(key, source_doc, item, pending))
                    .collect(),
            ),
            Object::Dictionary(dict) => {
                Object::Dictionary(self.remap_dict(key, source_doc, dict, pending))
            }
            Object::Stream(stream) => {
                let mut copied = stream.clone();
                copied.dict = self.remap_dict(key, source_doc, &stream.dict, pending);
                Object::Stream(copied)
            }
            other => other.clone(),
        }
    }

    fn remap_dict(
        &mut self,
        key: SourceKey,
        source_doc: &Document,
        dict: &Dictionary,
        pending: &mut Vec<ObjectId>,
    ) -> Dictionary {
        let mut copied = Dictionary::new();
        for (name, value) in dict.iter() {
            if self.is_stripped(name) {
                continue;
            }
            let value = self.remap(key, source_doc, value, pending);
            copied.set(name.clone(), value);
        }
        copied
    }

    /// 参照先に新しいIDを割り当てる。ページツリーやCatalogへの参照、解決できない参照は `None`。
    fn import_reference(
        &mut self,
        key: SourceKey,
        source_doc: &Document,
        old_id: ObjectId,
        pending: &mut Vec<ObjectId>,
    ) -> Option<ObjectId> {
        if let Some(&new_id) = self.imported.get(&(key, old_id)) {
            return Some(new_id);
        }

        let target = source_doc.get_object(old_id).ok()?;
        if let Object::Dictionary(dict) = target
            && let Ok(kind) = dict.get(b"Type").and_then(Object::as_name)
            && matches!(kind, b"Page" | b"Pages" | b"Catalog")
        {
            return None;
        }

        let new_id = self.doc.new_object_id();
        self.imported.insert((key, old_id), new_id);
        pending.push(old_id);
        Some(new_id)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    /// PDFドキュメントをバイト列として出力する。
    pub fn save_to_bytes(&mut self) -> crate::error::Result<Vec<u8>> {
        save_document(&mut self.doc)
    }
}

/// 文書をバイト列へシリアライズする。
pub fn save_document(doc: &mut Document) -> crate::error::Result<Vec<u8>> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| crate::error::PdfMixError::pdf_write(e.to_string()))?;
    Ok(buf)
}

/// PageStreamを新しい文書として組み立てる（メタデータはコピー元のまま）。
pub fn assemble(stream: &PageStream) -> crate::error::Result<Document> {
    let mut writer = PdfPageWriter::new();
    writer.write_pages(stream)?;
    Ok(writer.into_document())
}
