// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// Temporary object URLs handed out while files are being read.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    live: Mutex<HashSet<String>>,
    next: AtomicU64,
}

impl ObjectUrlRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn create(self: &Arc<Self>, mime: &str) -> ObjectUrl {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let url = format!("blob:article-editor/{mime}/{n}");
        self.live.lock().insert(url.clone());
        ObjectUrl {
            url,
            registry: Arc::clone(self),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    fn revoke(&self, url: &str) {
        if self.live.lock().remove(url) {
            debug!(url, "Revoked object url");
        }
    }
}

/// Revokes its URL when dropped, on every exit path.
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    registry: Arc<ObjectUrlRegistry>,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}

#[cfg(test)]
mod tests {
    use speculoos::prelude::*;

    use super::*;

    #[test]
    fn urls_are_revoked_on_drop() {
        let registry = ObjectUrlRegistry::new();
        let a = registry.create("image/png");
        let b = registry.create("image/png");
        assert_that!(a.as_str()).is_not_equal_to(b.as_str());
        assert_that!(registry.live_count()).is_equal_to(2);
        drop(a);
        assert_that!(registry.live_count()).is_equal_to(1);
        drop(b);
        assert_that!(registry.live_count()).is_equal_to(0);
    }
}
