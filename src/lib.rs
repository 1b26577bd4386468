// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Oracle CSV Exporter
//!
//! Exports whole schemas, individual tables or ad-hoc SQL queries from an
//! Oracle database as comma-separated text.
//!
//! The crate follows the **Hexagonal Architecture** (Ports and Adapters):
//! - `domain`: entities, errors and the CSV serializer.
//! - `ports`: traits the application needs from the database.
//! - `application`: target resolution, row streaming and the export loop.
//! - `infrastructure`: the Oracle session implementing the ports.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
