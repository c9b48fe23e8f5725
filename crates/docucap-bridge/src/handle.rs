// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Owned result of an enhance call, handed across the C boundary as an opaque
// pointer and released exactly once by the host.

use std::ffi::{CStr, CString};

use docucap_core::error::Result;
use docucap_core::types::EnhancedFrame;

/// Either the enhanced pixels or a NUL-terminated error message.
#[derive(Debug)]
pub struct EnhancementHandle {
    outcome: std::result::Result<EnhancedFrame, CString>,
}

impl EnhancementHandle {
    pub fn from_result(result: Result<EnhancedFrame>) -> Self {
        match result {
            Ok(frame) => Self { outcome: Ok(frame) },
            Err(err) => {
                tracing::warn!(kind = err.kind(), %err, "Enhancement failed");
                Self::failure(&err.to_string())
            }
        }
    }

    /// A failed handle carrying `message`. Interior NULs are dropped.
    pub fn failure(message: &str) -> Self {
        let bytes: Vec<u8> = message.bytes().filter(|&b| b != 0).collect();
        let message = CString::new(bytes).unwrap_or_default();
        Self {
            outcome: Err(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn frame(&self) -> Option<&EnhancedFrame> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&CStr> {
        self.outcome.as_ref().err().map(CString::as_c_str)
    }

    /// Take ownership of the pixels, for Rust callers.
    pub fn into_frame(self) -> Option<EnhancedFrame> {
        self.outcome.ok()
    }
}
