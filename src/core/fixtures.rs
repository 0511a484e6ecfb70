// Synthetic KS2 files for unit tests

use crate::core::constants::{length_width, HEADER_SIZE};

pub struct Ks2Builder {
    channels: usize,
    sampling_frequency: u32,
    general_info: bool,
    body: Vec<u8>,
}

impl Ks2Builder {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            sampling_frequency: 100,
            general_info: true,
            body: Vec::new(),
        }
    }

    pub fn without_general_info(mut self) -> Self {
        self.general_info = false;
        self
    }

    pub fn typed_record(mut self, parent: u8, child: u8, rdtp: u8, payload: &[u8]) -> Self {
        self.body.extend(encode_record(parent, child, rdtp, payload));
        self
    }

    /// Record whose length field is written as given instead of derived
    /// from the payload.
    pub fn sized_record(mut self, parent: u8, child: u8, rdtp: u8, length: u64, payload: &[u8]) -> Self {
        self.body.extend([parent, child]);
        self.body
            .extend_from_slice(&length.to_le_bytes()[..length_width(parent, child).bytes()]);
        self.body.extend([0, rdtp]);
        self.body.extend_from_slice(payload);
        self
    }

    pub fn raw_record(self, parent: u8, child: u8, payload: &[u8]) -> Self {
        self.typed_record(parent, child, 0, payload)
    }

    pub fn comment(self, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        self.raw_record(1, 4, &payload)
    }

    pub fn channel_indices(self, indices: &[i16]) -> Self {
        let payload: Vec<u8> = indices.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.typed_record(2, 48, 1, &payload)
    }

    pub fn float_column(self, child: u8, values: &[f32]) -> Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.typed_record(2, child, 3, &payload)
    }

    pub fn coefficients(self, coef_a: &[f32], coef_b: &[f32]) -> Self {
        self.float_column(3, coef_a).float_column(4, coef_b)
    }

    pub fn text_column(self, child: u8, width: usize, texts: &[&str]) -> Self {
        let mut payload = Vec::new();
        for text in texts {
            let mut field = text.as_bytes().to_vec();
            field.resize(width, b' ');
            payload.extend_from_slice(&field);
        }
        self.raw_record(2, child, &payload)
    }

    pub fn start_time(self, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        payload.resize(16, 0);
        self.raw_record(16, 3, &payload)
    }

    pub fn sample_count(self, count: u64) -> Self {
        self.typed_record(16, 30, 9, &count.to_le_bytes())
    }

    pub fn float_samples(self, values: &[f32]) -> Self {
        let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.typed_record(17, 2, 3, &payload)
    }

    pub fn footer(self, payload: &[u8]) -> Self {
        self.raw_record(18, 25, payload)
    }

    pub fn sentinel(mut self) -> Self {
        self.body.extend_from_slice(&[0, 0]);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = header(self.channels, self.sampling_frequency);
        if self.general_info {
            out.extend(encode_record(1, 1, 0, &[0]));
        }
        out.extend(self.body);
        out
    }
}

pub fn header(channels: usize, sampling_frequency: u32) -> Vec<u8> {
    let lines = [
        "\"KS2\"".to_string(),
        "\"01.00\"".to_string(),
        "\"unit test\"".to_string(),
        channels.to_string(),
        channels.to_string(),
        sampling_frequency.to_string(),
        "\"Hz\"".to_string(),
        "\"2\"".to_string(),
        "\"float\"".to_string(),
        "1".to_string(),
        "0".to_string(),
        "\"EN\"".to_string(),
        "0".to_string(),
        "0".to_string(),
        "0".to_string(),
        "0".to_string(),
    ];
    let mut raw = Vec::new();
    for line in &lines {
        raw.extend_from_slice(line.as_bytes());
        raw.extend_from_slice(b"\r\n");
    }
    raw.resize(HEADER_SIZE, b' ');
    raw
}

pub fn encode_record(parent: u8, child: u8, rdtp: u8, payload: &[u8]) -> Vec<u8> {
    let length = payload.len() as u64 + 2;
    let mut out = vec![parent, child];
    out.extend_from_slice(&length.to_le_bytes()[..length_width(parent, child).bytes()]);
    out.extend_from_slice(&[0, rdtp]);
    out.extend_from_slice(payload);
    out
}
