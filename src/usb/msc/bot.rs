//! Bulk-Only Transport wrappers
//!
//! The 31 byte command block wrapper (CBW) and 13 byte command status
//! wrapper (CSW) of the USB mass storage bulk-only transport, plus the SCSI
//! commands the class dispatches. Wrappers are little-endian on the wire;
//! the SCSI block addresses and counts inside the command block are
//! big-endian. Both directions are encoded and decoded explicitly, byte by
//! byte.

/// The CBW signature, `USBC` in little-endian
pub const CBW_SIGNATURE: u32 = 0x4342_5355;

/// The CSW signature, `USBS` in little-endian
pub const CSW_SIGNATURE: u32 = 0x5342_5355;

/// Size of a CBW on the wire
pub const CBW_SIZE: usize = 31;

/// Size of a CSW on the wire
pub const CSW_SIZE: usize = 13;

/// The command block wrapper sent by the host before every command
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandBlockWrapper {
    /// Signature identifying the packet as a CBW (`USBC`)
    pub signature: u32,

    /// Tag chosen by the host; echoed in the CSW
    pub tag: u32,

    /// Number of bytes of data the host expects to transfer
    pub data_transfer_length: u32,

    /// b\[7\] = direction: 0 = data-out (host to device), 1 = data-in
    pub flags: u8,

    /// b\[0..3\] = logical unit number
    pub lun: u8,

    /// Valid length of the command block, 1 to 16
    pub cb_length: u8,

    /// The command block to be executed by the device
    pub cb: [u8; 16],
}

impl CommandBlockWrapper {
    /// Decode a CBW from the 31 bytes received on the bulk-out endpoint
    pub fn from_le_bytes(raw: &[u8; CBW_SIZE]) -> Self {
        let mut cb = [0; 16];
        cb.copy_from_slice(&raw[15..31]);

        CommandBlockWrapper {
            signature: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            tag: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            data_transfer_length: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
            flags: raw[12],
            lun: raw[13],
            cb_length: raw[14],
            cb,
        }
    }

    /// Whether signature and command block length are valid
    pub fn is_valid(&self) -> bool {
        self.signature == CBW_SIGNATURE && self.cb_length >= 1 && self.cb_length <= 16
    }

    /// The block address of a READ(10)/WRITE(10), big-endian in the command
    /// block
    pub fn block_address(&self) -> u32 {
        u32::from_be_bytes([self.cb[2], self.cb[3], self.cb[4], self.cb[5]])
    }

    /// The block count of a READ(10)/WRITE(10), big-endian in the command
    /// block
    pub fn block_count(&self) -> u32 {
        u32::from(u16::from_be_bytes([self.cb[7], self.cb[8]]))
    }
}

/// Status values for the `status` byte of a CSW
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandStatus {
    Passed = 0x00,
    Failed = 0x01,
    PhaseError = 0x02,
}

/// The command status wrapper sent back after every command
#[derive(Clone, Copy, Debug)]
pub struct CommandStatusWrapper {
    /// Tag echoed from the CBW
    pub tag: u32,

    /// Difference between the expected and the transferred amount of data
    pub data_residue: u32,

    /// Outcome of the command
    pub status: u8,
}

impl CommandStatusWrapper {
    pub const fn new() -> Self {
        CommandStatusWrapper {
            tag: 0,
            data_residue: 0,
            status: CommandStatus::Passed as u8,
        }
    }

    /// Encode the CSW into its 13 wire bytes
    pub fn to_le_bytes(&self) -> [u8; CSW_SIZE] {
        let mut raw = [0; CSW_SIZE];

        raw[0..4].copy_from_slice(&CSW_SIGNATURE.to_le_bytes());
        raw[4..8].copy_from_slice(&self.tag.to_le_bytes());
        raw[8..12].copy_from_slice(&self.data_residue.to_le_bytes());
        raw[12] = self.status;

        raw
    }
}

/// The SCSI commands dispatched by the bulk-only transport
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScsiCommand {
    TestUnitReady = 0x00,
    RequestSense = 0x03,
    Inquiry = 0x12,
    ModeSense6 = 0x1a,
    StartStopUnit = 0x1b,
    ReceiveDiagnosticResult = 0x1c,
    AllowMediumRemoval = 0x1e,
    ReadFormatCapacities = 0x23,
    ReadCapacity10 = 0x25,
    Read10 = 0x28,
    Write10 = 0x2a,
    ModeSense10 = 0x5a,
    ReadCapacity16 = 0x9e,
}

impl ScsiCommand {
    /// Decode the operation code of a command block
    pub fn from_opcode(raw: u8) -> Option<Self> {
        Some(match raw {
            0x00 => ScsiCommand::TestUnitReady,
            0x03 => ScsiCommand::RequestSense,
            0x12 => ScsiCommand::Inquiry,
            0x1a => ScsiCommand::ModeSense6,
            0x1b => ScsiCommand::StartStopUnit,
            0x1c => ScsiCommand::ReceiveDiagnosticResult,
            0x1e => ScsiCommand::AllowMediumRemoval,
            0x23 => ScsiCommand::ReadFormatCapacities,
            0x25 => ScsiCommand::ReadCapacity10,
            0x28 => ScsiCommand::Read10,
            0x2a => ScsiCommand::Write10,
            0x5a => ScsiCommand::ModeSense10,
            0x9e => ScsiCommand::ReadCapacity16,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read10_cbw() -> [u8; CBW_SIZE] {
        let mut raw = [0; CBW_SIZE];
        raw[0..4].copy_from_slice(&CBW_SIGNATURE.to_le_bytes());
        raw[4..8].copy_from_slice(&0xdeadbeefu32.to_le_bytes());
        raw[8..12].copy_from_slice(&512u32.to_le_bytes());
        raw[12] = 0x80;
        raw[13] = 0;
        raw[14] = 10;
        // READ(10), LBA 0x010203, 2 blocks
        raw[15..25].copy_from_slice(&[0x28, 0x00, 0x00, 0x01, 0x02, 0x03, 0x00, 0x00, 0x02, 0x00]);
        raw
    }

    #[test]
    fn cbw_decodes_little_endian_wrapper_and_big_endian_lba() {
        let cbw = CommandBlockWrapper::from_le_bytes(&read10_cbw());

        assert!(cbw.is_valid());
        assert_eq!(cbw.tag, 0xdeadbeef);
        assert_eq!(cbw.data_transfer_length, 512);
        assert_eq!(cbw.cb_length, 10);
        assert_eq!(ScsiCommand::from_opcode(cbw.cb[0]), Some(ScsiCommand::Read10));
        assert_eq!(cbw.block_address(), 0x00010203);
        assert_eq!(cbw.block_count(), 2);
    }

    #[test]
    fn cbw_validation_rejects_bad_signature_and_length() {
        let mut raw = read10_cbw();
        raw[0] = 0x00;
        assert!(!CommandBlockWrapper::from_le_bytes(&raw).is_valid());

        let mut raw = read10_cbw();
        raw[14] = 0;
        assert!(!CommandBlockWrapper::from_le_bytes(&raw).is_valid());

        let mut raw = read10_cbw();
        raw[14] = 17;
        assert!(!CommandBlockWrapper::from_le_bytes(&raw).is_valid());
    }

    #[test]
    fn csw_wire_format() {
        let csw = CommandStatusWrapper {
            tag: 0x11223344,
            data_residue: 0x56,
            status: CommandStatus::Failed as u8,
        };

        assert_eq!(
            csw.to_le_bytes(),
            [
                0x55, 0x53, 0x42, 0x53, // "USBS"
                0x44, 0x33, 0x22, 0x11, // tag
                0x56, 0x00, 0x00, 0x00, // residue
                0x01, // status
            ]
        );
    }
}
