/*
 * Copyright 2006 - 2018, Werner Dittmann
 * Copyright 2026 - Francisco F. Pinochet
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *         http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! ZRTP message types and their codecs.

pub mod header;
pub mod hello;
pub mod commit;
pub mod dh_part;
pub mod confirm;
pub mod sas_relay;
pub mod other;

pub use commit::{CommitPacket, CommitParams};
pub use confirm::{ConfirmBody, ConfirmPacket};
pub use dh_part::DhPartPacket;
pub use header::{MessageHeader, MESSAGE_PREAMBLE, ZRTP_MAGIC};
pub use hello::HelloPacket;
pub use other::{AckPacket, ErrorPacket, GoClearPacket, PingAckPacket, PingPacket};
pub use sas_relay::{SasRelayBody, SasRelayPacket};
