//! The UDP front end. One loop reads datagrams and queues them; a dispatcher takes them off the
//! queue and runs each in its own task once a slot is free. At most `max_in_flight` datagrams are
//! being handled at any time, and the queue in front of the dispatcher holds as many again before
//! the receive loop stops reading from the socket. The [Forwarder] applies the same kind of limit
//! to the queries it sends upstream.

use std::{future::Future, io, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use tokio::{
    net::UdpSocket,
    sync::{mpsc, Semaphore},
    task::JoinSet,
};
use tracing::{debug, info, warn};

use crate::{
    forwarder::Forwarder,
    proto::MAX_MESSAGE_SIZE,
    upstream::Upstream,
};

struct Datagram {
    bytes: Bytes,
    peer: SocketAddr,
}

pub struct Server<U> {
    socket: Arc<UdpSocket>,
    forwarder: Arc<Forwarder<U>>,
    slots: Arc<Semaphore>,
    max_in_flight: usize,
}

impl<U: Upstream + 'static> Server<U> {
    pub async fn bind(
        addr: SocketAddr,
        forwarder: Forwarder<U>,
        max_in_flight: usize,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
            forwarder: Arc::new(forwarder),
            slots: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serves until `shutdown` completes. Requests still being handled at that point are
    /// cancelled.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let (queue, pending) = mpsc::channel(self.max_in_flight);
        tokio::select! {
            _ = shutdown => info!("shutting down"),
            _ = receive(Arc::clone(&self.socket), queue) => warn!("receive loop stopped"),
            _ = self.dispatch(pending) => warn!("dispatcher stopped"),
        }
    }

    async fn dispatch(&self, mut pending: mpsc::Receiver<Datagram>) {
        // dropping the set aborts whatever is still running
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                Some(datagram) = pending.recv() => {
                    let Ok(slot) = Arc::clone(&self.slots).acquire_owned().await else {
                        return;
                    };
                    let socket = Arc::clone(&self.socket);
                    let forwarder = Arc::clone(&self.forwarder);
                    tasks.spawn(async move {
                        let _slot = slot;
                        respond(&socket, &forwarder, datagram).await;
                    });
                }
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
                else => return,
            }
        }
    }
}

async fn receive(socket: Arc<UdpSocket>, queue: mpsc::Sender<Datagram>) {
    let mut buf = [0u8; MAX_MESSAGE_SIZE];
    loop {
        let (size, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(err) => {
                warn!(%err, "failed to receive datagram");
                continue;
            }
        };
        debug!(%peer, size, "received datagram");
        let datagram = Datagram {
            bytes: Bytes::copy_from_slice(&buf[..size]),
            peer,
        };
        if queue.send(datagram).await.is_err() {
            return;
        }
    }
}

async fn respond<U: Upstream>(socket: &UdpSocket, forwarder: &Forwarder<U>, datagram: Datagram) {
    let Some(reply) = forwarder.handle(&datagram.bytes).await else {
        debug!(peer = %datagram.peer, "dropping datagram without a reply");
        return;
    };
    if let Err(err) = socket.send_to(&reply, datagram.peer).await {
        warn!(peer = %datagram.peer, %err, "failed to send reply");
    }
}
