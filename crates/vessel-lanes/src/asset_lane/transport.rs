// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A fetch transport that moves bytes on a pool of worker threads.

use crossbeam_channel::{Receiver, Sender};
use std::collections::HashSet;
use std::io::Read;
use std::thread;
use std::time::Duration;
use vessel_core::address::path_from_file_url;
use vessel_core::error::FetchError;
use vessel_core::fetch::{FetchCompletion, FetchTicket, FetchTransport};
use vessel_core::lane::{Lane, LaneKind};

/// Configuration for the [`ThreadedTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Timeout applied to remote requests.
    pub http_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            http_timeout: Duration::from_secs(30),
        }
    }
}

struct FetchJob {
    ticket: FetchTicket,
    url: String,
}

/// Fetches `file://` URLs from disk and `http(s)://` URLs through `ureq`.
///
/// Workers never touch cache state. Each finished fetch is pushed onto a
/// completion channel that the cache drains when it polls. The pool can be
/// stopped with `shutdown` and started again with `start`.
pub struct ThreadedTransport {
    config: TransportConfig,
    job_tx: Option<Sender<FetchJob>>,
    completion_rx: Receiver<FetchCompletion>,
    workers: Vec<thread::JoinHandle<()>>,
    cancelled: HashSet<FetchTicket>,
    next_ticket: u64,
}

impl ThreadedTransport {
    /// Starts the worker pool.
    pub fn new(config: TransportConfig) -> Self {
        let mut transport = Self {
            config,
            job_tx: None,
            completion_rx: crossbeam_channel::never(),
            workers: Vec::new(),
            cancelled: HashSet::new(),
            next_ticket: 1,
        };
        transport.start();
        transport
    }

    /// Returns `true` while the worker pool accepts fetches.
    pub fn is_running(&self) -> bool {
        self.job_tx.is_some()
    }

    /// Number of fetches cancelled but not yet drained.
    pub fn cancelled_count(&self) -> usize {
        self.cancelled.len()
    }

    fn spawn_workers(&mut self) {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<FetchJob>();
        let (completion_tx, completion_rx) = crossbeam_channel::unbounded();
        let agent = ureq::AgentBuilder::new()
            .timeout(self.config.http_timeout)
            .build();

        let count = self.config.workers.max(1);
        self.workers = (0..count)
            .map(|_| {
                let job_rx = job_rx.clone();
                let completion_tx: Sender<FetchCompletion> = completion_tx.clone();
                let agent = agent.clone();
                thread::spawn(move || {
                    for job in job_rx.iter() {
                        let result = fetch(&agent, &job.url);
                        let completion = FetchCompletion {
                            ticket: job.ticket,
                            result,
                        };
                        if completion_tx.send(completion).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        self.job_tx = Some(job_tx);
        self.completion_rx = completion_rx;
        log::debug!("Fetch transport started with {} workers.", count);
    }
}

impl Default for ThreadedTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

fn fetch(agent: &ureq::Agent, url: &str) -> Result<Vec<u8>, FetchError> {
    if let Some(path) = path_from_file_url(url) {
        return std::fs::read(&path)
            .map_err(|e| FetchError::Network(format!("{}: {}", path.display(), e)));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(FetchError::Unknown(format!("unsupported scheme in '{url}'")));
    }

    match agent.get(url).call() {
        Ok(response) => {
            let mut bytes = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|e| FetchError::Network(e.to_string()))?;
            Ok(bytes)
        }
        Err(ureq::Error::Status(status, response)) => Err(FetchError::Server {
            status,
            message: response.status_text().to_string(),
        }),
        Err(ureq::Error::Transport(transport)) => Err(FetchError::Network(transport.to_string())),
    }
}

impl FetchTransport for ThreadedTransport {
    fn begin(&mut self, url: &str) -> Result<FetchTicket, FetchError> {
        let Some(job_tx) = self.job_tx.as_ref() else {
            return Err(FetchError::Unknown(format!(
                "fetch transport is shut down, refusing '{url}'"
            )));
        };
        let ticket = FetchTicket::new(self.next_ticket);
        let job = FetchJob {
            ticket,
            url: url.to_string(),
        };
        job_tx
            .send(job)
            .map_err(|_| FetchError::Unknown(format!("fetch workers are gone, refusing '{url}'")))?;
        self.next_ticket += 1;
        Ok(ticket)
    }

    fn cancel(&mut self, ticket: FetchTicket) {
        self.cancelled.insert(ticket);
    }

    fn poll_completions(&mut self, out: &mut Vec<FetchCompletion>) {
        for completion in self.completion_rx.try_iter() {
            if self.cancelled.remove(&completion.ticket) {
                continue;
            }
            out.push(completion);
        }
    }

    fn start(&mut self) {
        if !self.is_running() {
            self.spawn_workers();
        }
    }

    fn shutdown(&mut self) {
        // Closing the job channel ends every worker loop.
        self.job_tx = None;
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        self.cancelled.clear();
    }
}

impl Drop for ThreadedTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Lane for ThreadedTransport {
    fn strategy_name(&self) -> &'static str {
        "ThreadedTransport"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use vessel_core::address::file_url;

    fn wait_for(transport: &mut ThreadedTransport, count: usize) -> Vec<FetchCompletion> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut out = Vec::new();
        while out.len() < count && Instant::now() < deadline {
            transport.poll_completions(&mut out);
            thread::sleep(Duration::from_millis(5));
        }
        out
    }

    #[test]
    fn reads_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.bin");
        std::fs::write(&path, b"hello").unwrap();

        let mut transport = ThreadedTransport::new(TransportConfig {
            workers: 2,
            ..Default::default()
        });
        let ticket = transport.begin(&file_url(&path)).unwrap();
        let completions = wait_for(&mut transport, 1);
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].ticket, ticket);
        assert_eq!(completions[0].result.as_deref(), Ok(&b"hello"[..]));
    }

    #[test]
    fn missing_file_is_a_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = ThreadedTransport::default();
        transport.begin(&file_url(&dir.path().join("missing.png"))).unwrap();
        let completions = wait_for(&mut transport, 1);
        assert!(matches!(
            completions[0].result,
            Err(FetchError::Network(_))
        ));
    }

    #[test]
    fn unsupported_scheme_is_unknown() {
        let mut transport = ThreadedTransport::default();
        transport.begin("ftp://example.com/a.png").unwrap();
        let completions = wait_for(&mut transport, 1);
        assert!(matches!(completions[0].result, Err(FetchError::Unknown(_))));
    }

    #[test]
    fn cancelled_fetches_are_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"a").unwrap();

        let mut transport = ThreadedTransport::new(TransportConfig {
            workers: 1,
            ..Default::default()
        });
        let cancelled = transport.begin(&file_url(&path)).unwrap();
        transport.cancel(cancelled);
        let kept = transport.begin(&file_url(&path)).unwrap();

        let completions = wait_for(&mut transport, 1);
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].ticket, kept);
        assert_eq!(transport.cancelled_count(), 0);
    }

    #[test]
    fn stopped_transport_refuses_fetches_until_restarted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"again").unwrap();

        let mut transport = ThreadedTransport::new(TransportConfig {
            workers: 1,
            ..Default::default()
        });
        transport.shutdown();
        assert!(!transport.is_running());
        assert!(matches!(
            transport.begin(&file_url(&path)),
            Err(FetchError::Unknown(_))
        ));

        transport.start();
        assert!(transport.is_running());
        let ticket = transport.begin(&file_url(&path)).unwrap();
        let completions = wait_for(&mut transport, 1);
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].ticket, ticket);
        assert_eq!(completions[0].result.as_deref(), Ok(&b"again"[..]));
    }
}
