// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - STL import and export

mod stl;

pub use stl::{export_stl, import_stl, import_stl_file, write_binary_stl};
