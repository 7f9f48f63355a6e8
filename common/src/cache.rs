//! 抽出マスクのキャッシュ
//!
//! (画像ID, 色, 閾値) をキーにして抽出結果を使い回す。
//! ドラッグや方向キーのたびに同じ画像を再抽出しないため。
//! セッションは描画のたびに現在ページ・現在モードで使うキー以外を捨てる。

use crate::extract::{extract_lines, Threshold, Tint, TintedMask};
use image::RgbaImage;
use std::collections::HashMap;
use std::sync::Arc;

/// キャッシュキー
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MaskKey {
    pub source: String,
    pub tint: Tint,
    pub threshold: Threshold,
}

impl MaskKey {
    pub fn new(source: &str, tint: Tint, threshold: f32) -> Self {
        Self {
            source: source.to_string(),
            tint,
            threshold: Threshold(threshold),
        }
    }
}

#[derive(Debug, Default)]
pub struct MaskCache {
    entries: HashMap<MaskKey, Arc<TintedMask>>,
    hits: u64,
    misses: u64,
}

impl MaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// キャッシュにあればそれを、なければ抽出して登録する
    ///
    /// `source_id` は画像の中身が変わったら必ず変わるID（パス＋ハッシュ等）を渡すこと。
    pub fn get_or_extract(
        &mut self,
        source_id: &str,
        image: &RgbaImage,
        tint: Tint,
        threshold: f32,
    ) -> Arc<TintedMask> {
        let key = MaskKey::new(source_id, tint, threshold);

        if let Some(mask) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(mask);
        }

        self.misses += 1;
        log::debug!("extracting mask: source={} tint={:?}", source_id, tint);
        let mask = Arc::new(extract_lines(image, tint, threshold));
        self.entries.insert(key, Arc::clone(&mask));
        mask
    }

    /// 指定画像のエントリをすべて削除
    pub fn invalidate(&mut self, source_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| k.source != source_id);
        before - self.entries.len()
    }

    /// `keep` にあるキー以外を削除する。戻り値は削除した数。
    pub fn retain_keys(&mut self, keep: &[MaskKey]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| keep.contains(k));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (ヒット数, ミス数)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn ink() -> RgbaImage {
        RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]))
    }

    #[test]
    fn test_hit_returns_same_mask() {
        let mut cache = MaskCache::new();
        let a = cache.get_or_extract("old", &ink(), Tint::red(100), 200.0);
        let b = cache.get_or_extract("old", &ink(), Tint::red(100), 200.0);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats(), (1, 1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_key_includes_tint_and_threshold() {
        let mut cache = MaskCache::new();
        cache.get_or_extract("old", &ink(), Tint::red(100), 200.0);
        cache.get_or_extract("old", &ink(), Tint::red(150), 200.0);
        cache.get_or_extract("old", &ink(), Tint::red(100), 128.0);
        cache.get_or_extract("new", &ink(), Tint::red(100), 200.0);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.stats(), (0, 4));
    }

    #[test]
    fn test_invalidate_source() {
        let mut cache = MaskCache::new();
        cache.get_or_extract("old", &ink(), Tint::red(100), 200.0);
        cache.get_or_extract("old", &ink(), Tint::black(), 200.0);
        cache.get_or_extract("new", &ink(), Tint::blue(100), 200.0);
        assert_eq!(cache.invalidate("old"), 2);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_retain_keys_drops_everything_else() {
        let mut cache = MaskCache::new();
        let kept = cache.get_or_extract("p1-old", &ink(), Tint::red(120), 200.0);
        cache.get_or_extract("p1-old", &ink(), Tint::black(), 200.0);
        cache.get_or_extract("p0-new", &ink(), Tint::blue(120), 200.0);

        let keep = [
            MaskKey::new("p1-old", Tint::red(120), 200.0),
            MaskKey::new("p1-new", Tint::blue(120), 200.0),
        ];
        assert_eq!(cache.retain_keys(&keep), 2);
        assert_eq!(cache.len(), 1);

        let again = cache.get_or_extract("p1-old", &ink(), Tint::red(120), 200.0);
        assert!(Arc::ptr_eq(&kept, &again));
        assert_eq!(cache.retain_keys(&[]), 1);
        assert!(cache.is_empty());
    }
}
