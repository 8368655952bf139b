// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::bridge::Bridge;

#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
}

impl AppState {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }
}

#[cfg(test)]
impl AppState {
    /// State over an in-memory bridge on Polygon mainnet.
    pub fn for_tests() -> (Arc<crate::testing::MockWalletProvider>, Self) {
        use crate::blockchain::POLYGON_MAINNET;
        use crate::confirmation_poller::PollerConfig;
        use crate::testing::MockWalletProvider;

        let mock = Arc::new(MockWalletProvider::new(POLYGON_MAINNET.chain_id));
        let bridge = Bridge::in_memory(mock.clone(), POLYGON_MAINNET, PollerConfig::default());
        (mock, Self::new(Arc::new(bridge)))
    }
}
