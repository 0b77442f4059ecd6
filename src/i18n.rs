//! UI strings for the supported languages

use crate::settings::Language;

const EN: &[(&str, &str)] = &[
    ("menu", "File"),
    ("open", "Open"),
    ("settings", "Setting"),
    ("convert", "Convert"),
    ("exit", "Exit"),
    ("prev", "Prev"),
    ("next", "Next"),
    ("goto", "Go to"),
    ("one_page", "One Page"),
    ("all_pages", "All Pages"),
    ("help", "Help"),
    ("view_help", "View Help"),
    ("about", "About folio"),
    ("font", "Font"),
    ("theme", "Theme"),
    ("language", "Language"),
    ("theme_light", "Light"),
    ("theme_dark", "Dark"),
    ("language_en", "English (US)"),
    ("language_th", "ภาษาไทย"),
    ("settings_title", "Settings"),
    ("convert_title", "Convert"),
    ("no_document", "No document loaded."),
    ("view", "View"),
    ("vertical", "Vertical"),
    ("horizontal", "Horizontal"),
    ("page", "Page"),
    ("zoom", "Zoom"),
    ("bookmark", "Bookmark"),
    ("bookmark_saved", "Bookmark saved"),
    ("bookmark_name", "Bookmark name"),
    ("bookmarks", "Bookmarks"),
    ("highlights", "Highlights"),
    ("password", "Password"),
    ("render_failed", "Page could not be rendered"),
];

const TH: &[(&str, &str)] = &[
    ("menu", "ไฟล์"),
    ("open", "เปิด"),
    ("settings", "ตั้งค่า"),
    ("convert", "แปลงเอกสาร"),
    ("exit", "ออก"),
    ("prev", "ก่อนหน้า"),
    ("next", "ถัดไป"),
    ("goto", "ข้ามหน้า"),
    ("one_page", "ทีละหน้า"),
    ("all_pages", "ทุกหน้า"),
    ("help", "ช่วยเหลือ"),
    ("view_help", "ดูการช่วยเหลือ"),
    ("about", "เกี่ยวกับ folio"),
    ("font", "ฟอนต์"),
    ("theme", "ธีม"),
    ("language", "ภาษา"),
    ("theme_light", "โหมดสว่าง"),
    ("theme_dark", "โหมดมืด"),
    ("language_en", "English (US)"),
    ("language_th", "ภาษาไทย"),
    ("settings_title", "ตั้งค่า"),
    ("convert_title", "แปลงเอกสาร"),
    ("no_document", "ยังไม่มีเอกสารถูกเปิด"),
    ("view", "มุมมอง"),
    ("vertical", "แนวตั้ง"),
    ("horizontal", "อ่านแบบซ้ายขวาเหมือนหนังสือ"),
    ("page", "หน้า"),
    ("zoom", "ซูม"),
    ("bookmark", "บุ๊กมาร์ก"),
    ("bookmark_saved", "บันทึกบุ๊กมาร์กแล้ว"),
    ("bookmark_name", "ชื่อบุ๊กมาร์ก"),
    ("bookmarks", "บุ๊กมาร์ก"),
    ("highlights", "ไฮไลต์"),
    ("password", "รหัสผ่าน"),
    ("render_failed", "ไม่สามารถแสดงหน้านี้ได้"),
];

/// Look up `key` for `language`, falling back to English and then to the key
/// itself.
pub fn tr(language: Language, key: &'static str) -> &'static str {
    let table = match language {
        Language::En => EN,
        Language::Th => TH,
    };
    lookup(table, key)
        .or_else(|| lookup(EN, key))
        .unwrap_or(key)
}

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_languages_cover_the_same_keys() {
        let mut en: Vec<_> = EN.iter().map(|(k, _)| *k).collect();
        let mut th: Vec<_> = TH.iter().map(|(k, _)| *k).collect();
        en.sort_unstable();
        th.sort_unstable();
        assert_eq!(en, th);
    }

    #[test]
    fn lookup_by_language() {
        assert_eq!(tr(Language::En, "next"), "Next");
        assert_eq!(tr(Language::Th, "next"), "ถัดไป");
    }

    #[test]
    fn unknown_key_returns_key() {
        assert_eq!(tr(Language::Th, "no_such_key"), "no_such_key");
    }
}
