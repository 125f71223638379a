//! Turns a decoded request into the response sent back to the client.
//!
//! Without an upstream every question is answered locally with the same A record. With one,
//! every question is sent upstream on its own and the first answer of each reply is collected.
//! Queries from all requests share one limit, so a request with many questions waits for slots
//! like any other.

use std::{io, net::Ipv4Addr, time::Duration};

use bytes::Bytes;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::{
    config::Config,
    proto::{
        ARecord, Header, Opcode, Packet, PacketBuilder, PacketType, Question, Resource,
        ResponseCode,
    },
    upstream::{UdpUpstream, Upstream, UpstreamError},
};

pub const LOCAL_TTL: u32 = 60;
pub const LOCAL_ADDRESS: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

pub struct Forwarder<U> {
    upstream: Option<U>,
    timeout: Duration,
    /// One permit per upstream query in flight.
    queries: Semaphore,
}

impl Forwarder<UdpUpstream> {
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.resolver.map(UdpUpstream::new),
            config.upstream_timeout,
            config.max_in_flight,
        )
    }
}

impl<U: Upstream> Forwarder<U> {
    /// `max_queries` bounds the upstream queries running at once across every request.
    pub fn new(upstream: Option<U>, timeout: Duration, max_queries: usize) -> Self {
        Self {
            upstream,
            timeout,
            queries: Semaphore::new(max_queries),
        }
    }

    pub fn is_forwarding(&self) -> bool {
        self.upstream.is_some()
    }

    /// Decodes a datagram and builds the encoded reply. Datagrams that do not decode get a
    /// format error, or nothing at all when not even the id can be read. Responses are never
    /// answered, whether they decode or not.
    pub async fn handle(&self, datagram: &[u8]) -> Option<Bytes> {
        match Packet::decode(datagram) {
            Ok(request) if request.header().packet_type == PacketType::Response => {
                debug!(id = request.header().id, "ignoring response");
                None
            }
            Ok(request) => Some(self.respond(&request).await.encode()),
            Err(_) if datagram.get(2).is_some_and(|flags| flags & 0x80 != 0) => {
                debug!("ignoring undecodable response");
                None
            }
            Err(err) => {
                warn!(%err, "failed to decode request");
                Self::format_error(datagram).map(|response| response.encode())
            }
        }
    }

    #[tracing::instrument(skip_all, fields(id = request.header().id))]
    pub async fn respond(&self, request: &Packet) -> Packet {
        match &self.upstream {
            None => Self::synthesize(request),
            Some(upstream) => self.forward(upstream, request).await,
        }
    }

    /// A reply for a datagram that could not be decoded: its id, QR set and FORMERR.
    pub fn format_error(datagram: &[u8]) -> Option<Packet> {
        let id = u16::from_be_bytes([*datagram.first()?, *datagram.get(1)?]);
        let mut header = Header::new(id);
        header.packet_type = PacketType::Response;
        header.response_code = ResponseCode::FormatError;
        Some(Packet::builder(header).build())
    }

    /// The response header and echoed questions shared by both modes.
    fn response_template(request: &Packet) -> PacketBuilder {
        let code = match request.header().opcode {
            Opcode::Query => ResponseCode::None,
            _ => ResponseCode::NotImplemented,
        };
        request
            .questions()
            .iter()
            .cloned()
            .fold(request.respond(code), PacketBuilder::add_question)
    }

    fn synthesize(request: &Packet) -> Packet {
        let record = ARecord::new(LOCAL_TTL, LOCAL_ADDRESS);
        request
            .questions()
            .iter()
            .map(|question| record.to_resource(question.name().clone()))
            .fold(Self::response_template(request), PacketBuilder::add_answer)
            .build()
    }

    async fn forward(&self, upstream: &U, request: &Packet) -> Packet {
        let lookups = request
            .questions()
            .iter()
            .map(|question| self.lookup(upstream, request, question));

        // join_all keeps question order whatever order the replies arrive in
        let mut response = Self::response_template(request);
        for answer in join_all(lookups).await.into_iter().flatten() {
            response = response.add_answer(answer);
        }
        response.build()
    }

    async fn lookup(
        &self,
        upstream: &U,
        request: &Packet,
        question: &Question,
    ) -> Option<Resource> {
        let sub_request = Self::sub_request(request, question);
        let Ok(_permit) = self.queries.acquire().await else {
            return None;
        };
        let reply = match tokio::time::timeout(self.timeout, upstream.query(&sub_request)).await {
            Ok(reply) => reply,
            Err(elapsed) => Err(UpstreamError::Unavailable(io::Error::from(elapsed))),
        };
        match reply {
            Ok(reply) => {
                let answer = reply.answers().first().cloned();
                if answer.is_none() {
                    debug!(%question, "upstream returned no answer");
                }
                answer
            }
            Err(err) => {
                warn!(%question, %err, "upstream query failed");
                None
            }
        }
    }

    /// A query carrying only `question`, with the request's id, opcode and recursion flags.
    fn sub_request(request: &Packet, question: &Question) -> Packet {
        let mut header = Header::new(request.header().id);
        header.opcode = request.header().opcode;
        header.recursion_desired = request.header().recursion_desired;
        header.recursion_available = request.header().recursion_available;
        Packet::builder(header)
            .add_question(question.clone())
            .build()
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use super::*;
    use crate::proto::{Class, QClass, QType, Type};

    /// Answers from a fixed table keyed by question name; names not in the table fail.
    #[derive(Default)]
    struct FakeUpstream {
        answers: HashMap<String, Vec<Ipv4Addr>>,
        stall: Option<String>,
        seen: Arc<Mutex<Vec<Packet>>>,
    }

    impl FakeUpstream {
        fn answer(mut self, name: &str, addrs: &[Ipv4Addr]) -> Self {
            self.answers.insert(name.to_string(), addrs.to_vec());
            self
        }

        fn stall(mut self, name: &str) -> Self {
            self.stall = Some(name.to_string());
            self
        }
    }

    impl Upstream for FakeUpstream {
        async fn query(&self, request: &Packet) -> Result<Packet, UpstreamError> {
            self.seen.lock().unwrap().push(request.clone());
            let question = &request.questions()[0];
            let name = question.name().to_string();
            if self.stall.as_deref() == Some(name.as_str()) {
                std::future::pending::<()>().await;
            }
            let Some(addrs) = self.answers.get(&name) else {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into());
            };
            let mut builder = request.respond(ResponseCode::None).add_question(question.clone());
            for addr in addrs {
                let name = question.name().clone();
                builder = builder.add_answer(ARecord::new(300, *addr).to_resource(name));
            }
            Ok(builder.build())
        }
    }

    fn request(opcode: Opcode, names: &[&str]) -> Packet {
        let mut header = Header::new(0x1234);
        header.opcode = opcode;
        header.recursion_desired = true;
        header.reserved = 7;
        names
            .iter()
            .map(|name| Question::new(QType::A, QClass::IN, name.parse().unwrap()))
            .fold(Packet::builder(header), PacketBuilder::add_question)
            .build()
    }

    fn local() -> Forwarder<FakeUpstream> {
        Forwarder::new(None, Duration::from_secs(1), 4)
    }

    fn forwarding(upstream: FakeUpstream) -> Forwarder<FakeUpstream> {
        Forwarder::new(Some(upstream), Duration::from_millis(200), 4)
    }

    #[tokio::test]
    async fn synthesizes_answer_locally() {
        let response = local()
            .respond(&request(Opcode::Query, &["codecrafters.io"]))
            .await;

        let header = response.header();
        assert_eq!(header.id, 0x1234);
        assert_eq!(header.packet_type, PacketType::Response);
        assert_eq!(header.opcode, Opcode::Query);
        assert!(!header.authoritative_answer);
        assert!(!header.truncated);
        assert!(header.recursion_desired);
        assert_eq!(header.reserved, 0);
        assert_eq!(header.response_code, ResponseCode::None);
        assert_eq!(header.question_entries, 1);
        assert_eq!(header.answer_entries, 1);

        let answer = &response.answers()[0];
        assert_eq!(answer.name().to_string(), "codecrafters.io");
        assert_eq!(answer.typ(), &Type::A);
        assert_eq!(answer.class(), &Class::IN);
        assert_eq!(answer.ttl(), &60);
        assert_eq!(answer.data(), &[8, 8, 8, 8]);
    }

    #[tokio::test]
    async fn unknown_opcode_is_not_implemented() {
        let request = request(Opcode::InverseQuery, &["codecrafters.io", "example.com"]);
        let response = local().respond(&request).await;

        assert_eq!(response.header().response_code, ResponseCode::NotImplemented);
        assert_eq!(response.header().opcode, Opcode::InverseQuery);
        assert_eq!(response.header().id, 0x1234);
        assert_eq!(response.questions(), request.questions());
        assert_eq!(response.header().question_entries, 2);
    }

    #[tokio::test]
    async fn forwards_each_question_separately() {
        let upstream = FakeUpstream::default()
            .answer("abc.example.com", &[Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(9, 9, 9, 9)])
            .answer("def.example.com", &[Ipv4Addr::new(2, 2, 2, 2)]);
        let seen = Arc::clone(&upstream.seen);
        let request = request(Opcode::Query, &["abc.example.com", "def.example.com"]);

        let response = forwarding(upstream).respond(&request).await;

        assert_eq!(response.header().answer_entries, 2);
        assert_eq!(response.answers()[0].data(), &[1, 1, 1, 1]);
        assert_eq!(response.answers()[1].data(), &[2, 2, 2, 2]);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for (sub_request, question) in seen.iter().zip(request.questions()) {
            let header = sub_request.header();
            assert_eq!(header.id, 0x1234);
            assert_eq!(header.packet_type, PacketType::Query);
            assert_eq!(header.response_code, ResponseCode::None);
            assert_eq!(header.reserved, 0);
            assert!(header.recursion_desired);
            assert_eq!(sub_request.questions(), &[question.clone()]);
        }
    }

    #[tokio::test]
    async fn failed_question_yields_no_answer() {
        let upstream =
            FakeUpstream::default().answer("abc.example.com", &[Ipv4Addr::new(1, 1, 1, 1)]);
        let request = request(Opcode::Query, &["abc.example.com", "broken.example.com"]);

        let response = forwarding(upstream).respond(&request).await;

        assert_eq!(response.header().question_entries, 2);
        assert_eq!(response.header().answer_entries, 1);
        assert_eq!(response.answers()[0].name().to_string(), "abc.example.com");
    }

    #[tokio::test]
    async fn stalled_question_times_out() {
        let upstream = FakeUpstream::default()
            .answer("abc.example.com", &[Ipv4Addr::new(1, 1, 1, 1)])
            .answer("slow.example.com", &[Ipv4Addr::new(3, 3, 3, 3)])
            .stall("slow.example.com");
        let request = request(Opcode::Query, &["slow.example.com", "abc.example.com"]);

        let response = forwarding(upstream).respond(&request).await;

        assert_eq!(response.header().answer_entries, 1);
        assert_eq!(response.answers()[0].name().to_string(), "abc.example.com");
    }

    #[tokio::test]
    async fn empty_reply_yields_no_answer() {
        let upstream = FakeUpstream::default().answer("empty.example.com", &[]);
        let response = forwarding(upstream)
            .respond(&request(Opcode::Query, &["empty.example.com"]))
            .await;
        assert_eq!(response.header().question_entries, 1);
        assert!(response.answers().is_empty());
    }

    #[tokio::test]
    async fn handle_answers_garbage_with_format_error() {
        let reply = local().handle(&[0xab, 0xcd, 0x01]).await.unwrap();
        let response = Packet::decode(&reply).unwrap();
        assert_eq!(response.header().id, 0xabcd);
        assert_eq!(response.header().packet_type, PacketType::Response);
        assert_eq!(response.header().response_code, ResponseCode::FormatError);
        assert!(response.questions().is_empty());

        assert!(local().handle(&[0xab]).await.is_none());
    }

    #[tokio::test]
    async fn handle_ignores_responses() {
        let forwarder = local();
        let query = request(Opcode::Query, &["codecrafters.io"]).encode();
        let reply = forwarder.handle(&query).await.unwrap();
        assert!(forwarder.handle(&reply).await.is_none());

        let format_error = forwarder.handle(&[0xab, 0xcd, 0x01]).await.unwrap();
        assert!(forwarder.handle(&format_error).await.is_none());

        assert!(forwarder.handle(&[0xab, 0xcd, 0x80]).await.is_none());
    }

    #[tokio::test]
    async fn handle_encodes_local_answer() {
        let request = request(Opcode::Query, &["codecrafters.io"]);
        let reply = local().handle(&request.encode()).await.unwrap();
        let response = Packet::decode(&reply).unwrap();
        assert_eq!(response.answers().len(), 1);
        assert_eq!(response.questions(), request.questions());
    }
}
