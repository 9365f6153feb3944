//! Folder enumeration across paginated listing calls.

use crate::remote::{ListedEntry, RemoteError, RemoteStore};
use futures_util::stream::{self, Stream};
use std::collections::VecDeque;
use tracing::debug;

enum NextPage {
    Initial,
    Continue(String),
    Exhausted,
}

struct ListingState<'a> {
    store: &'a dyn RemoteStore,
    folder: &'a str,
    buffered: VecDeque<ListedEntry>,
    next: NextPage,
}

/// Lazily lists the immediate children of `folder` in server order.
///
/// Pages are fetched only as entries are consumed; errors end the stream and
/// are not retried here. Dropping the stream and calling `list` again starts
/// a fresh cursor chain.
pub fn list<'a>(
    store: &'a dyn RemoteStore,
    folder: &'a str,
) -> impl Stream<Item = Result<ListedEntry, RemoteError>> + Send + 'a {
    let state = ListingState {
        store,
        folder,
        buffered: VecDeque::new(),
        next: NextPage::Initial,
    };

    stream::try_unfold(state, next_entry)
}

async fn next_entry(
    mut state: ListingState<'_>,
) -> Result<Option<(ListedEntry, ListingState<'_>)>, RemoteError> {
    loop {
        if let Some(entry) = state.buffered.pop_front() {
            return Ok(Some((entry, state)));
        }
        let page = match std::mem::replace(&mut state.next, NextPage::Exhausted) {
            NextPage::Initial => state.store.list_folder(state.folder).await?,
            NextPage::Continue(cursor) => state.store.list_folder_continue(&cursor).await?,
            NextPage::Exhausted => return Ok(None),
        };
        debug!(
            "Listed {} entries of '{}' (has_more: {})",
            page.entries.len(),
            state.folder,
            page.has_more
        );
        if page.has_more {
            state.next = NextPage::Continue(page.cursor);
        }
        state.buffered.extend(page.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{ByteSink, EntryKind, ListPage};
    use async_trait::async_trait;
    use futures_util::TryStreamExt;
    use std::sync::Mutex;

    struct PagedStore {
        pages: Vec<ListPage>,
        calls: Mutex<Vec<String>>,
        fail_continue: bool,
    }

    impl PagedStore {
        fn new(pages: Vec<ListPage>) -> Self {
            Self {
                pages,
                calls: Mutex::new(Vec::new()),
                fail_continue: false,
            }
        }
    }

    #[async_trait]
    impl RemoteStore for PagedStore {
        async fn list_folder(&self, folder: &str) -> Result<ListPage, RemoteError> {
            self.calls.lock().unwrap().push(format!("list:{folder}"));
            Ok(self.pages[0].clone())
        }

        async fn list_folder_continue(&self, cursor: &str) -> Result<ListPage, RemoteError> {
            self.calls.lock().unwrap().push(format!("continue:{cursor}"));
            if self.fail_continue {
                return Err(RemoteError::Interrupted("reset".into()));
            }
            let index: usize = cursor.parse().unwrap();
            Ok(self.pages[index].clone())
        }

        async fn download_archive(
            &self,
            _folder: &str,
            _sink: &mut ByteSink<'_>,
        ) -> Result<u64, RemoteError> {
            unreachable!("listing never downloads")
        }

        async fn download_file(
            &self,
            _path: &str,
            _sink: &mut ByteSink<'_>,
        ) -> Result<u64, RemoteError> {
            unreachable!("listing never downloads")
        }
    }

    fn page(names: &[&str], next: Option<usize>) -> ListPage {
        ListPage {
            entries: names.iter().map(|n| ListedEntry::file(*n)).collect(),
            cursor: next.map(|n| n.to_string()).unwrap_or_default(),
            has_more: next.is_some(),
        }
    }

    #[tokio::test]
    async fn concatenates_pages_in_server_order() {
        let store = PagedStore::new(vec![
            page(&["a", "b"], Some(1)),
            page(&["c"], Some(2)),
            page(&["d"], None),
        ]);
        let names: Vec<String> = list(&store, "/docs")
            .map_ok(|e| e.name)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(
            *store.calls.lock().unwrap(),
            vec!["list:/docs", "continue:1", "continue:2"]
        );
    }

    #[tokio::test]
    async fn fetches_pages_lazily() {
        let store = PagedStore::new(vec![page(&["a"], Some(1)), page(&["b"], None)]);
        let entries = list(&store, "");
        futures_util::pin_mut!(entries);
        let first = entries.try_next().await.unwrap().unwrap();
        assert_eq!(first.kind, EntryKind::File);
        assert_eq!(store.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_folder_yields_nothing() {
        let store = PagedStore::new(vec![page(&[], None)]);
        let entries: Vec<ListedEntry> = list(&store, "/empty").try_collect().await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn continuation_errors_propagate_unmodified() {
        let mut store = PagedStore::new(vec![page(&["a"], Some(1))]);
        store.fail_continue = true;
        let result: Result<Vec<ListedEntry>, RemoteError> = list(&store, "/x").try_collect().await;
        assert!(matches!(result, Err(RemoteError::Interrupted(_))));
    }
}
