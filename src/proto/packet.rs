use bytes::{Bytes, BytesMut};

use super::{
    header::{Header, PacketType, ResponseCode},
    question::Question,
    resource::Resource,
    WireError,
};

/// A decoded or to-be-encoded message: the header, the question section and the answer
/// section. Authority and additional records are neither parsed nor written; their counts are
/// kept in the decoded header but always encoded as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<Resource>,
}

pub struct PacketBuilder {
    header: Header,
    questions: Vec<Question>,
    answers: Vec<Resource>,
}

// Counts come from the wire, so they only size the allocation up to a point.
fn get_entry_vec<T>(entries: u16) -> Vec<T> {
    if entries > 16 {
        Vec::new()
    } else {
        Vec::with_capacity(entries.into())
    }
}

impl Packet {
    pub fn new(id: u16) -> Self {
        Self {
            header: Header::new(id),
            questions: Vec::new(),
            answers: Vec::new(),
        }
    }

    pub fn builder(header: Header) -> PacketBuilder {
        PacketBuilder {
            header,
            questions: Vec::new(),
            answers: Vec::new(),
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Resource] {
        &self.answers
    }

    pub fn decode(buffer: &[u8]) -> Result<Self, WireError> {
        let header = Header::decode(buffer)?;

        let mut questions = get_entry_vec(header.question_entries);
        let mut answers = get_entry_vec(header.answer_entries);

        let mut offset = Header::SIZE;

        for _ in 0..header.question_entries {
            let (question, next) = Question::decode(buffer, offset)?;
            offset = next;
            questions.push(question);
        }

        for _ in 0..header.answer_entries {
            let (answer, next) = Resource::decode(buffer, offset)?;
            offset = next;
            answers.push(answer);
        }

        Ok(Self {
            header,
            questions,
            answers,
        })
    }

    pub fn len_in_packet(&self) -> usize {
        Header::SIZE
            + self.questions.iter().map(Question::len_in_packet).sum::<usize>()
            + self.answers.iter().map(Resource::len_in_packet).sum::<usize>()
    }

    /// Writes the header, every question and every answer. The section counts are taken from
    /// the sections themselves.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len_in_packet());

        let mut header = self.header.clone();
        header.question_entries = self.questions.len() as u16;
        header.answer_entries = self.answers.len() as u16;
        header.authority_entries = 0;
        header.additional_entries = 0;
        header.encode(&mut buf);

        for question in &self.questions {
            question.encode(&mut buf);
        }
        for answer in &self.answers {
            answer.encode(&mut buf);
        }
        buf.freeze()
    }

    /// Starts a response to this packet: same id, opcode and recursion flags, with the given
    /// response code and no sections yet.
    pub fn respond(&self, code: ResponseCode) -> PacketBuilder {
        let mut header = Header::new(self.header.id);
        header.packet_type = PacketType::Response;
        header.opcode = self.header.opcode;
        header.recursion_desired = self.header.recursion_desired;
        header.recursion_available = self.header.recursion_available;
        header.response_code = code;
        Self::builder(header)
    }
}

impl PacketBuilder {
    pub fn add_question(mut self, question: Question) -> Self {
        self.questions.push(question);
        self.header.question_entries += 1;
        self
    }

    pub fn add_answer(mut self, answer: Resource) -> Self {
        self.answers.push(answer);
        self.header.answer_entries += 1;
        self
    }

    pub fn build(self) -> Packet {
        Packet {
            header: self.header,
            questions: self.questions,
            answers: self.answers,
        }
    }
}
