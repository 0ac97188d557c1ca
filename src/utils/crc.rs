/// CRC32 as used by MPEG-2 systems sections, including the Program Stream Map.
/// ITU-T H.222.0 / ISO/IEC 13818-1 Annex A.
/// Polynomial 0x04C11DB7, initial value 0xFFFFFFFF, no reflection, no final xor.
const CRC32_MPEG2: u32 = 0x04C11DB7;

/// Table-driven MPEG-2 CRC32 calculator.
#[derive(Debug, Clone)]
pub struct Crc32Mpeg2 {
    table: [u32; 256],
}

impl Crc32Mpeg2 {
    /// Creates a calculator with its lookup table filled in.
    pub fn new() -> Self {
        let mut table = [0u32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = (i as u32) << 24;
            for _ in 0..8 {
                crc = if (crc & 0x80000000) != 0 {
                    (crc << 1) ^ CRC32_MPEG2
                } else {
                    crc << 1
                };
            }
            *entry = crc;
        }
        Self { table }
    }

    /// Calculates the CRC over `data`.
    ///
    /// Running the calculation over a section together with its trailing CRC
    /// yields 0, which is how a reader validates a received map.
    ///
    /// ```
    /// use psmux::utils::Crc32Mpeg2;
    ///
    /// let crc = Crc32Mpeg2::new();
    /// assert_eq!(crc.calculate(&[0x01, 0x01]), 0xD66FB816);
    /// ```
    pub fn calculate(&self, data: &[u8]) -> u32 {
        let mut crc = 0xFFFFFFFF;
        for &byte in data {
            let index = ((crc >> 24) ^ (byte as u32)) & 0xFF;
            crc = (crc << 8) ^ self.table[index as usize];
        }
        crc
    }
}

impl Default for Crc32Mpeg2 {
    fn default() -> Self {
        Self::new()
    }
}
