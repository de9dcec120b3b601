// Audio sink port - text handed off for speech, fire-and-forget

pub trait AnnouncementSink: Send + Sync {
    fn announce(&self, text: &str);
}

pub const STARTED: &str = "Aplikasi berhasil dijalankan";
pub const STOPPED: &str = "Aplikasi berhasil dihentikan";
pub const AUDIO_ALLOWED: &str = "Notifikasi audio telah diijinkan";
