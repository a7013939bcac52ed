//! Ordered set of opened documents and their page offset table

use log::{debug, info};
use rayon::prelude::*;

use super::backend::{DocumentBackend, DocumentHandle};
use super::error::LoadError;

/// Ordered documents presented as one virtual page space.
///
/// `offsets[i]` is the number of pages in all documents before `i`. The set is
/// built once and never mutated.
pub struct DocumentSet<D> {
    documents: Vec<D>,
    offsets: Vec<usize>,
    total_pages: usize,
}

impl<D: DocumentHandle> DocumentSet<D> {
    /// Open every source, in parallel, preserving order.
    ///
    /// Fails as a whole if any source fails; the first failing source in
    /// source order is reported.
    pub fn open<B>(backend: &B, sources: &[String]) -> Result<Self, LoadError>
    where
        B: DocumentBackend<Document = D>,
    {
        if sources.is_empty() {
            return Err(LoadError::NoSources);
        }

        info!("Opening {} document(s)", sources.len());
        let documents = sources
            .par_iter()
            .map(|source| backend.open(source))
            .collect::<Vec<_>>()
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let set = Self::from_documents(documents);
        for (index, doc) in set.documents.iter().enumerate() {
            debug!(
                "Document {index} ({}) has {} pages, offset {}",
                sources[index],
                doc.page_count(),
                set.offsets[index]
            );
        }
        info!("Document set ready: {} pages total", set.total_pages);
        Ok(set)
    }

    /// Build the offset table over already opened documents
    #[must_use]
    pub fn from_documents(documents: Vec<D>) -> Self {
        let mut offsets = Vec::with_capacity(documents.len());
        let mut total_pages = 0;
        for doc in &documents {
            offsets.push(total_pages);
            total_pages += doc.page_count();
        }

        Self {
            documents,
            offsets,
            total_pages,
        }
    }

    #[must_use]
    pub fn page_offsets(&self) -> &[usize] {
        &self.offsets
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    #[must_use]
    pub fn document(&self, index: usize) -> Option<&D> {
        self.documents.get(index)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedBackend, ScriptedDocument};
    use proptest::prelude::*;

    #[test]
    fn offsets_are_exclusive_prefix_sum() {
        let set = DocumentSet::from_documents(vec![
            ScriptedDocument::new(3),
            ScriptedDocument::new(5),
            ScriptedDocument::new(0),
            ScriptedDocument::new(2),
        ]);

        assert_eq!(set.page_offsets(), &[0, 3, 8, 8]);
        assert_eq!(set.total_pages(), 10);
        assert!(set.document(3).is_some());
        assert!(set.document(4).is_none());
    }

    #[test]
    fn open_preserves_source_order() {
        let backend = ScriptedBackend::new()
            .with_document("a.pdf", ScriptedDocument::new(3))
            .with_document("b.pdf", ScriptedDocument::new(5));

        let set = DocumentSet::open(&backend, &["b.pdf".into(), "a.pdf".into()]).unwrap();
        assert_eq!(set.page_offsets(), &[0, 5]);
        assert_eq!(set.total_pages(), 8);
    }

    #[test]
    fn open_fails_if_any_source_fails() {
        let backend = ScriptedBackend::new().with_document("a.pdf", ScriptedDocument::new(3));

        let result = DocumentSet::open(&backend, &["a.pdf".into(), "missing.pdf".into()]);
        match result {
            Err(LoadError::Open { location, .. }) => assert_eq!(location, "missing.pdf"),
            other => panic!("expected open failure, got {:?}", other.map(|s| s.total_pages())),
        }
    }

    #[test]
    fn open_rejects_empty_source_list() {
        let backend = ScriptedBackend::new();
        assert!(matches!(
            DocumentSet::open(&backend, &[]),
            Err(LoadError::NoSources)
        ));
    }

    proptest! {
        #[test]
        fn offsets_match_page_counts(counts in prop::collection::vec(0usize..50, 1..12)) {
            let set = DocumentSet::from_documents(
                counts.iter().map(|&c| ScriptedDocument::new(c)).collect(),
            );

            let offsets = set.page_offsets();
            prop_assert_eq!(offsets.len(), counts.len());
            prop_assert_eq!(offsets[0], 0);
            for i in 0..counts.len() {
                prop_assert_eq!(offsets[i], counts[..i].iter().sum::<usize>());
            }
            prop_assert_eq!(set.total_pages(), counts.iter().sum::<usize>());
        }
    }
}
