pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];
pub const PCAP_READER_BUFFER_SIZE: usize = 65536;

pub const BLOCK_SECTION_HEADER: u32 = 0x0A0D_0D0A;
pub const BLOCK_INTERFACE_DESCRIPTION: u32 = 0x0000_0001;
pub const BLOCK_ENHANCED_PACKET: u32 = 0x0000_0006;
pub const BYTE_ORDER_MAGIC: u32 = 0x1A2B_3C4D;
pub const SECTION_VERSION_MAJOR: u16 = 1;
pub const SECTION_VERSION_MINOR: u16 = 0;
pub const LINKTYPE_ETHERNET: u16 = 1;
pub const SNAP_LEN: u32 = 65535;
/// Block type, total length and trailing total length.
pub const BLOCK_FRAMING_LEN: usize = 12;
