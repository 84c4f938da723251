use crate::errors::{DocumapError, DocumapResult, ErrorKind};
use crate::model::Model;
use crate::store::DocumentCursor;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// A lazy, single-pass, forward-only sequence of models over a store cursor.
///
/// Each underlying document is reconstructed into a model on demand, at the
/// moment the caller requests it; the store round trip for a page happens at
/// that pull, not at query time. An unconsumed cursor keeps its store-side
/// resource alive until dropped; consumers stop early by ceasing iteration.
///
/// Store-level errors raised while pulling are wrapped as
/// [ErrorKind::InvalidQuery] with the cause preserved; model reconstruction
/// failures pass through as [ErrorKind::ModelMapping]. Empty documents yield
/// nothing and are skipped.
pub struct ModelCursor<M> {
    cursor: DocumentCursor,
    _phantom: PhantomData<M>,
}

impl<M> ModelCursor<M>
where
    M: Model,
{
    pub(crate) fn new(cursor: DocumentCursor) -> Self {
        ModelCursor {
            cursor,
            _phantom: PhantomData,
        }
    }

    /// A cursor that yields zero models and terminates normally.
    pub fn empty() -> Self {
        ModelCursor {
            cursor: DocumentCursor::empty(),
            _phantom: PhantomData,
        }
    }
}

// the underlying cursor is an opaque iterator; there is nothing more to show
impl<M> Debug for ModelCursor<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCursor").finish_non_exhaustive()
    }
}

/// Wraps a store-level iteration error into `InvalidQuery`, leaving errors
/// that already carry a query or mapping kind untouched.
pub(crate) fn wrap_cursor_error(error: DocumapError) -> DocumapError {
    match error.kind() {
        ErrorKind::InvalidQuery | ErrorKind::ModelMapping => error,
        _ => DocumapError::new_with_cause(
            "Store rejected the query during iteration",
            ErrorKind::InvalidQuery,
            error,
        ),
    }
}

impl<M> Iterator for ModelCursor<M>
where
    M: Model,
{
    type Item = DocumapResult<M>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.cursor.next() {
                Some(Ok(doc)) => match M::from_document(doc) {
                    Ok(Some(model)) => return Some(Ok(model)),
                    // an empty document constructs nothing; move on
                    Ok(None) => continue,
                    Err(e) => return Some(Err(e)),
                },
                Some(Err(e)) => return Some(Err(wrap_cursor_error(e))),
                None => return None,
            }
        }
    }
}
