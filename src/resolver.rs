//! Background reverse-DNS lookups.
//!
//! The capture thread only enqueues; a small pool of workers does the
//! blocking lookup and writes the result back through the registry.

use crate::events::{EventBus, NetworkEvent};
use crate::registry::{DeviceKey, DeviceRegistry};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

pub trait HostnameResolver: Send + Sync {
    /// Name for `ip`, or `None` when the lookup fails or has no answer.
    fn reverse_lookup(&self, ip: IpAddr) -> Option<String>;
}

/// System resolver via `getnameinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

impl HostnameResolver for DnsResolver {
    fn reverse_lookup(&self, ip: IpAddr) -> Option<String> {
        match dns_lookup::lookup_addr(&ip) {
            // getnameinfo echoes the numeric address when there is no PTR record
            Ok(name) if name != ip.to_string() => Some(name),
            Ok(_) => None,
            Err(e) => {
                tracing::trace!(%ip, error = %e, "reverse lookup failed");
                None
            }
        }
    }
}

pub fn default_workers() -> usize {
    (num_cpus::get() / 2).clamp(1, 4)
}

pub struct ResolverPool {
    tx: Option<Sender<DeviceKey>>,
    stopping: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl ResolverPool {
    pub fn spawn(
        resolver: Arc<dyn HostnameResolver>,
        devices: Arc<DeviceRegistry>,
        events: Arc<EventBus>,
        workers: usize,
        queue_capacity: usize,
    ) -> std::io::Result<Self> {
        let (tx, rx) = bounded(queue_capacity.max(1));
        let stopping = Arc::new(AtomicBool::new(false));
        let count = if workers == 0 { default_workers() } else { workers };

        let mut handles = Vec::with_capacity(count);
        for id in 0..count {
            let worker = Worker {
                rx: rx.clone(),
                resolver: Arc::clone(&resolver),
                devices: Arc::clone(&devices),
                events: Arc::clone(&events),
                stopping: Arc::clone(&stopping),
            };
            let handle = std::thread::Builder::new()
                .name(format!("netsight-resolver-{}", id))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }
        tracing::debug!(workers = count, queue = queue_capacity, "resolver pool started");

        Ok(ResolverPool {
            tx: Some(tx),
            stopping,
            workers: handles,
        })
    }

    /// Queue a lookup. False when the queue is full, in which case the
    /// device keeps its address as hostname.
    pub fn request(&self, key: DeviceKey) -> bool {
        match &self.tx {
            Some(tx) => match tx.try_send(key) {
                Ok(()) => true,
                Err(_) => {
                    tracing::trace!(ip = %key.ip, "resolver queue full, lookup skipped");
                    false
                }
            },
            None => false,
        }
    }

    /// Abandon queued lookups and join the workers. A lookup already in
    /// progress runs to completion first.
    pub fn shutdown(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.tx = None;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("resolver worker panicked");
            }
        }
    }
}

impl Drop for ResolverPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    rx: Receiver<DeviceKey>,
    resolver: Arc<dyn HostnameResolver>,
    devices: Arc<DeviceRegistry>,
    events: Arc<EventBus>,
    stopping: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) {
        for key in self.rx.iter() {
            if self.stopping.load(Ordering::Relaxed) {
                break;
            }
            let Some(name) = self.resolver.reverse_lookup(key.ip) else {
                continue;
            };
            if let Some(device) = self.devices.set_hostname(&key, &name) {
                tracing::debug!(ip = %key.ip, hostname = %name, "hostname resolved");
                self.events.publish(NetworkEvent::DeviceUpdated(device));
            }
        }
    }
}
