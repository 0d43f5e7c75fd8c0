use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Counts {
    total: usize,
    per_ip: HashMap<IpAddr, usize>,
}

/// Caps concurrent client connections, overall and per peer IP.
#[derive(Clone, Debug)]
pub struct ConnectionLimiter {
    counts: Arc<Mutex<Counts>>,
    max_total: usize,
    max_per_ip: usize,
}

/// Holds one connection slot until dropped.
#[derive(Debug)]
pub struct ConnectionPermit {
    counts: Arc<Mutex<Counts>>,
    ip: IpAddr,
}

fn lock(counts: &Mutex<Counts>) -> MutexGuard<'_, Counts> {
    counts.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConnectionLimiter {
    pub fn new(max_total: usize, max_per_ip: usize) -> Self {
        ConnectionLimiter {
            counts: Arc::new(Mutex::new(Counts::default())),
            max_total,
            max_per_ip,
        }
    }

    /// Claim a slot for a connection from `ip`, or `None` if either limit is reached.
    pub fn try_acquire(&self, ip: IpAddr) -> Option<ConnectionPermit> {
        let mut counts = lock(&self.counts);
        if counts.total >= self.max_total {
            return None;
        }
        if counts.per_ip.get(&ip).copied().unwrap_or(0) >= self.max_per_ip {
            return None;
        }
        *counts.per_ip.entry(ip).or_insert(0) += 1;
        counts.total += 1;
        Some(ConnectionPermit {
            counts: Arc::clone(&self.counts),
            ip,
        })
    }

    pub fn active(&self) -> usize {
        lock(&self.counts).total
    }

    pub fn active_for(&self, ip: IpAddr) -> usize {
        lock(&self.counts).per_ip.get(&ip).copied().unwrap_or(0)
    }

    pub fn max_total(&self) -> usize {
        self.max_total
    }
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        let mut counts = lock(&self.counts);
        if let Some(from_ip) = counts.per_ip.get_mut(&self.ip) {
            *from_ip -= 1;
            if *from_ip == 0 {
                counts.per_ip.remove(&self.ip);
            }
        }
        counts.total -= 1;
    }
}
