// Record kinds: what each (parent, child) tag pair decodes into

use crate::core::constants::*;

/// Per-channel column carried by a channel info record (parent 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelColumn {
    Index,
    CoefA,
    CoefB,
    Unit,
    CalCoef,
    Offset,
    Name,
    Range,
    Lpf,
    Hpf,
}

/// Element layout of a channel column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    I16,
    F32,
    /// Fixed-width, padded text.
    Text(usize),
}

impl ColumnLayout {
    pub fn width(self) -> usize {
        match self {
            ColumnLayout::I16 => 2,
            ColumnLayout::F32 => 4,
            ColumnLayout::Text(width) => width,
        }
    }
}

pub const CHANNEL_COLUMNS: [(u8, ChannelColumn, ColumnLayout); 10] = [
    (48, ChannelColumn::Index, ColumnLayout::I16),
    (3, ChannelColumn::CoefA, ColumnLayout::F32),
    (4, ChannelColumn::CoefB, ColumnLayout::F32),
    (5, ChannelColumn::Unit, ColumnLayout::Text(10)),
    (8, ChannelColumn::CalCoef, ColumnLayout::F32),
    (12, ChannelColumn::Offset, ColumnLayout::F32),
    (49, ChannelColumn::Name, ColumnLayout::Text(40)),
    (51, ChannelColumn::Range, ColumnLayout::Text(20)),
    (53, ChannelColumn::Lpf, ColumnLayout::Text(20)),
    (54, ChannelColumn::Hpf, ColumnLayout::Text(20)),
];

impl ChannelColumn {
    pub fn from_child(child: u8) -> Option<(ChannelColumn, ColumnLayout)> {
        CHANNEL_COLUMNS
            .iter()
            .find(|(c, _, _)| *c == child)
            .map(|(_, column, layout)| (*column, *layout))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Comment,
    DigitalInputs,
    MeasuringMode,
    ChannelArray(ChannelColumn, ColumnLayout),
    StartTime,
    SampleCount,
    BulkSamples,
    Footer,
    /// Known parent, undocumented child: skipped by length.
    Skip,
}

impl RecordKind {
    pub fn classify(parent: u8, child: u8) -> RecordKind {
        match (parent, child) {
            (PARENT_GENERAL_INFO, CHILD_COMMENT) => RecordKind::Comment,
            (PARENT_GENERAL_INFO, CHILD_DIGITAL_INPUTS) => RecordKind::DigitalInputs,
            (PARENT_GENERAL_INFO, CHILD_MEASURING_MODE) => RecordKind::MeasuringMode,
            (PARENT_CHANNEL_INFO, _) => match ChannelColumn::from_child(child) {
                Some((column, layout)) => RecordKind::ChannelArray(column, layout),
                None => RecordKind::Skip,
            },
            (PARENT_DATA_HEADER, CHILD_START_TIME) => RecordKind::StartTime,
            (PARENT_DATA_HEADER, CHILD_SAMPLE_COUNT) => RecordKind::SampleCount,
            (PARENT_DATA, _) => RecordKind::BulkSamples,
            (PARENT_DATA_FOOTER, _) => RecordKind::Footer,
            _ => RecordKind::Skip,
        }
    }
}

pub fn is_variable_header(parent: u8) -> bool {
    matches!(parent, PARENT_GENERAL_INFO | PARENT_CHANNEL_INFO)
}

pub fn is_fixed_block(parent: u8) -> bool {
    matches!(parent, PARENT_DATA_HEADER | PARENT_DATA | PARENT_DATA_FOOTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_channel_columns() {
        assert_eq!(
            RecordKind::classify(2, 48),
            RecordKind::ChannelArray(ChannelColumn::Index, ColumnLayout::I16)
        );
        assert_eq!(
            RecordKind::classify(2, 49),
            RecordKind::ChannelArray(ChannelColumn::Name, ColumnLayout::Text(40))
        );
        assert_eq!(
            RecordKind::classify(2, 5),
            RecordKind::ChannelArray(ChannelColumn::Unit, ColumnLayout::Text(10))
        );
        assert_eq!(RecordKind::classify(2, 6), RecordKind::Skip);
    }

    #[test]
    fn test_classify_fixed_block() {
        assert_eq!(RecordKind::classify(16, 3), RecordKind::StartTime);
        assert_eq!(RecordKind::classify(16, 30), RecordKind::SampleCount);
        assert_eq!(RecordKind::classify(16, 35), RecordKind::Skip);
        assert_eq!(RecordKind::classify(17, 1), RecordKind::BulkSamples);
        assert_eq!(RecordKind::classify(17, 2), RecordKind::BulkSamples);
        assert_eq!(RecordKind::classify(18, 25), RecordKind::Footer);
    }

    #[test]
    fn test_classify_general_info() {
        assert_eq!(RecordKind::classify(1, 4), RecordKind::Comment);
        assert_eq!(RecordKind::classify(1, 62), RecordKind::Skip);
        assert_eq!(RecordKind::classify(3, 3), RecordKind::Skip);
    }

    #[test]
    fn test_phase_predicates() {
        assert!(is_variable_header(1) && is_variable_header(2));
        assert!(!is_variable_header(16));
        assert!(is_fixed_block(16) && is_fixed_block(17) && is_fixed_block(18));
        assert!(!is_fixed_block(0) && !is_fixed_block(19) && !is_fixed_block(2));
    }
}
