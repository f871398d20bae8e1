//! Random, collision-checked panel and page identifiers.
//!
//! Ids read `{workspace}-{panel|page}-{suffix}` where the suffix is drawn from
//! `[0-9a-z]`. Draws are retried against the live id set a bounded number of
//! times; running out of attempts is a fault.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::DockConfig;
use crate::error::{DockFault, IdKind};
use crate::model::{DockSnapshot, PageId, PanelId, WorkspaceId};

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Source of fresh ids.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    rng: SmallRng,
    max_attempts: u32,
    suffix_len: usize,
}

impl IdGenerator {
    /// Seeded from `config.id_seed` when set, otherwise from the OS.
    #[must_use]
    pub fn new(config: &DockConfig) -> Self {
        let rng = match config.id_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        Self {
            rng,
            max_attempts: config.id_max_attempts,
            suffix_len: config.id_suffix_len,
        }
    }

    fn suffix(&mut self) -> String {
        (0..self.suffix_len)
            .map(|_| char::from(ALPHABET[self.rng.random_range(0..ALPHABET.len())]))
            .collect()
    }

    /// Draw an id not rejected by `is_taken`.
    pub fn generate(
        &mut self,
        workspace: &WorkspaceId,
        kind: IdKind,
        is_taken: impl Fn(&str) -> bool,
    ) -> Result<String, DockFault> {
        for _ in 0..self.max_attempts {
            let candidate = format!("{workspace}-{}-{}", kind.as_str(), self.suffix());
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
            tracing::trace!(
                target: "ftui.dock",
                candidate = %candidate,
                "dock id collision, retrying"
            );
        }
        Err(DockFault::IdExhausted {
            kind,
            attempts: self.max_attempts,
        })
    }

    /// Fresh panel id, unique across both panel and page tables.
    pub fn panel_id(&mut self, snapshot: &DockSnapshot) -> Result<PanelId, DockFault> {
        self.generate(&snapshot.workspace_id, IdKind::Panel, |raw| {
            id_in_use(snapshot, raw)
        })
        .map(PanelId::new)
    }

    /// Fresh page id, unique across both panel and page tables.
    pub fn page_id(&mut self, snapshot: &DockSnapshot) -> Result<PageId, DockFault> {
        self.generate(&snapshot.workspace_id, IdKind::Page, |raw| {
            id_in_use(snapshot, raw)
        })
        .map(PageId::new)
    }
}

fn id_in_use(snapshot: &DockSnapshot, raw: &str) -> bool {
    let as_panel = PanelId::new(raw);
    let as_page = PageId::new(raw);
    snapshot.panels.contains_key(&as_panel) || snapshot.pages.contains_key(&as_page)
}
