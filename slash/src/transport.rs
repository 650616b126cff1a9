//! Process-group abstraction (spec.md section 6, "Process-group transport"):
//! the minimal collective operations the distributed query protocol needs.
//!
//! No MPI/gRPC crate exists in the teacher's or pack's dependency stacks,
//! and fabricating one would defeat the point of this exercise, so ranks
//! are simulated with `std::thread` + `std::sync::mpsc`, exactly the way a
//! single-process integration test would stand in for a real cluster.
use crate::error::{Error, Result};

/// Blocking point-to-point transport over fixed-size `u32` payloads, tagged
/// per round so that messages from different tree-reduction iterations
/// never mix on the wire (spec.md section 4.4, "Tag iter prevents
/// cross-round mixing").
pub trait Transport: Send + Sync {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn send(&self, buf: &[u32], dest: usize, tag: u32) -> Result<()>;
    fn recv(&self, buf: &mut [u32], source: usize, tag: u32) -> Result<()>;
}

struct Envelope {
    tag: u32,
    payload: Vec<u32>,
}

/// One rank's endpoint in an in-process [`Transport`] group: a channel to
/// every other rank, indexed by peer rank, carrying tagged payloads.
pub struct LocalProcessGroup {
    rank: usize,
    size: usize,
    senders: Vec<std::sync::mpsc::Sender<Envelope>>,
    receivers: Vec<std::sync::Mutex<std::sync::mpsc::Receiver<Envelope>>>,
}

impl LocalProcessGroup {
    /// Build `size` endpoints, each wired with a full mesh of channels to
    /// every other endpoint, so any ordered `(src, dst)` pair can
    /// communicate directly and in FIFO order.
    pub fn new_group(size: usize) -> Vec<LocalProcessGroup> {
        let mut senders: Vec<Vec<std::sync::mpsc::Sender<Envelope>>> = Vec::with_capacity(size);
        let mut receivers: Vec<Vec<Option<std::sync::mpsc::Receiver<Envelope>>>> =
            Vec::with_capacity(size);
        for _ in 0..size {
            senders.push(Vec::with_capacity(size));
            receivers.push(Vec::with_capacity(size));
        }
        for i in 0..size {
            for _j in 0..size {
                let (tx, rx) = std::sync::mpsc::channel();
                senders[i].push(tx);
                receivers[i].push(Some(rx));
            }
        }

        let mut groups = Vec::with_capacity(size);
        for i in 0..size {
            let my_senders = senders[i].clone();
            let mut my_receivers = Vec::with_capacity(size);
            for j in 0..size {
                my_receivers
                    .push(std::sync::Mutex::new(receivers[j][i].take().unwrap()));
            }
            groups.push(LocalProcessGroup {
                rank: i,
                size,
                senders: my_senders,
                receivers: my_receivers,
            });
        }
        groups
    }
}

impl Transport for LocalProcessGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, buf: &[u32], dest: usize, tag: u32) -> Result<()> {
        self.senders[dest]
            .send(Envelope { tag, payload: buf.to_vec() })
            .map_err(|e| Error::Transport(e.to_string()))
    }

    fn recv(&self, buf: &mut [u32], source: usize, tag: u32) -> Result<()> {
        let rx = self.receivers[source]
            .lock()
            .map_err(|_| Error::Transport("receiver lock poisoned".into()))?;
        let envelope = rx
            .recv()
            .map_err(|e| Error::Transport(e.to_string()))?;
        if envelope.tag != tag {
            return Err(Error::Transport(format!(
                "tag mismatch: expected {}, got {}",
                tag, envelope.tag
            )));
        }
        if envelope.payload.len() != buf.len() {
            return Err(Error::Transport(format!(
                "payload length mismatch: expected {}, got {}",
                buf.len(),
                envelope.payload.len()
            )));
        }
        buf.copy_from_slice(&envelope.payload);
        Ok(())
    }
}

/// A trivial single-rank transport for local (non-distributed) use,
/// grounded on the W=1 case of spec.md section 8: no peer ever exists, so
/// `send`/`recv` are unreachable in practice.
pub struct SingleProcess;

impl Transport for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, _buf: &[u32], _dest: usize, _tag: u32) -> Result<()> {
        Err(Error::Transport("no peers in a single-process group".into()))
    }

    fn recv(&self, _buf: &mut [u32], _source: usize, _tag: u32) -> Result<()> {
        Err(Error::Transport("no peers in a single-process group".into()))
    }
}
