//! Name tables from TS 101 756 and related renderings.

static LANGUAGE_NAMES: [&str; 128] = [
    "Unknown/not applicable",
    "Albanian",
    "Breton",
    "Catalan",
    "Croatian",
    "Welsh",
    "Czech",
    "Danish",
    "German",
    "English",
    "Spanish",
    "Esperanto",
    "Estonian",
    "Basque",
    "Faroese",
    "French",
    "Frisian",
    "Irish",
    "Gaelic",
    "Galician",
    "Icelandic",
    "Italian",
    "Lappish",
    "Latin",
    "Latvian",
    "Luxembourgian",
    "Lithuanian",
    "Hungarian",
    "Maltese",
    "Dutch",
    "Norwegian",
    "Occitan",
    "Polish",
    "Portuguese",
    "Romanian",
    "Romansh",
    "Serbian",
    "Slovak",
    "Slovene",
    "Finnish",
    "Swedish",
    "Turkish",
    "Flemish",
    "Walloon",
    "rfu",
    "rfu",
    "rfu",
    "rfu",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Reserved for national assignment",
    "Background sound/clean feed",
    "rfu",
    "rfu",
    "rfu",
    "rfu",
    "Zulu",
    "Vietnamese",
    "Uzbek",
    "Urdu",
    "Ukranian",
    "Thai",
    "Telugu",
    "Tatar",
    "Tamil",
    "Tadzhik",
    "Swahili",
    "Sranan Tongo",
    "Somali",
    "Sinhalese",
    "Shona",
    "Serbo-Croat",
    "Rusyn",
    "Russian",
    "Quechua",
    "Pushtu",
    "Punjabi",
    "Persian",
    "Papiamento",
    "Oriya",
    "Nepali",
    "Ndebele",
    "Marathi",
    "Moldavian",
    "Malaysian",
    "Malagasay",
    "Macedonian",
    "Laotian",
    "Korean",
    "Khmer",
    "Kazakh",
    "Kannada",
    "Japanese",
    "Indonesian",
    "Hindi",
    "Hebrew",
    "Hausa",
    "Gurani",
    "Gujurati",
    "Greek",
    "Georgian",
    "Fulani",
    "Dari",
    "Chuvash",
    "Chinese",
    "Burmese",
    "Bulgarian",
    "Bengali",
    "Belorussian",
    "Bambora",
    "Azerbaijani",
    "Assamese",
    "Armenian",
    "Arabic",
    "Amharic",
];

/// TS 101 756 table 9.
pub fn language_name(code: u8) -> &'static str {
    LANGUAGE_NAMES
        .get(code as usize)
        .copied()
        .unwrap_or("invalid language code")
}

/// FIG 0/18 and 0/19 announcement types (TS 101 756 tables 14 and 15).
static ANNOUNCEMENT_TYPES: [&str; 16] = [
    "Alarm",
    "Road Traffic flash",
    "Transport flash",
    "Warning/Service",
    "News flash",
    "Area weather flash",
    "Event announcement",
    "Special event",
    "Programme Information",
    "Sport report",
    "Financial report",
    "Reserved for future definition",
    "Reserved for future definition",
    "Reserved for future definition",
    "Reserved for future definition",
    "Reserved for future definition",
];

pub fn announcement_type(bit: usize) -> &'static str {
    ANNOUNCEMENT_TYPES[bit & 0x0F]
}

/// FIG 0/17 programme type codes, one row per international table
/// (TS 101 756 tables 12 and 13).
static PROGRAMME_TYPES: [[&str; 32]; 2] = [
    [
        "No programme type",
        "News",
        "Current Affairs",
        "Information",
        "Sport",
        "Education",
        "Drama",
        "Culture",
        "Science",
        "Varied",
        "Pop Music",
        "Rock Music",
        "Easy Listening Music",
        "Light Classical",
        "Serious Classical",
        "Other Music",
        "Weather/meteorology",
        "Finance/Business",
        "Children's programmes",
        "Social Affairs",
        "Religion",
        "Phone In",
        "Travel",
        "Leisure",
        "Jazz Music",
        "Country Music",
        "National Music",
        "Oldies Music",
        "Folk Music",
        "Documentary",
        "Not used",
        "Not used",
    ],
    [
        "No program type",
        "News",
        "Information",
        "Sports",
        "Talk",
        "Rock",
        "Classic Rock",
        "Adult Hits",
        "Soft Rock",
        "Top 40",
        "Country",
        "Oldies",
        "Soft",
        "Nostalgia",
        "Jazz",
        "Classical",
        "Rhythm and Blues",
        "Soft Rhythm and Blues",
        "Foreign Language",
        "Religious Music",
        "Religious Talk",
        "Personality",
        "Public",
        "College",
        "rfu",
        "rfu",
        "rfu",
        "rfu",
        "rfu",
        "Weather",
        "Not used",
        "Not used",
    ],
];

pub fn programme_type(international_table_id: u8, pty: u8) -> &'static str {
    match international_table_id {
        1 | 2 => PROGRAMME_TYPES[international_table_id as usize - 1]
            .get(pty as usize)
            .copied()
            .unwrap_or("invalid programme type"),
        _ => "unknown international table Id",
    }
}

/// TS 101 756 table 2.
static DSCTY_TYPES: [&str; 64] = [
    "Unspecified data",
    "Traffic Message Channel (TMC)",
    "Emergency Warning System (EWS)",
    "Interactive Text Transmission System (ITTS)",
    "Paging",
    "Transparent Data Channel (TDC)",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "MPEG-2 Transport Stream, see ETSI TS 102 427",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Rfu",
    "Embedded IP packets",
    "Multimedia Object Transfer (MOT)",
    "Proprietary service: no DSCTy signalled",
    "Not used",
    "Not used",
];

pub fn dscty_type(dscty: u8) -> &'static str {
    DSCTY_TYPES
        .get(dscty as usize)
        .copied()
        .unwrap_or("invalid DSCTy")
}

/// TS 102 367 5.4.1 Conditional Access Mode, used in FIG 0/3.
static CA_MODES: [&str; 8] = [
    "Sub-channel CA",
    "Data Group CA",
    "MOT CA",
    "proprietary CA",
    "reserved",
    "reserved",
    "reserved",
    "reserved",
];

pub fn ca_mode(mode: u8) -> &'static str {
    CA_MODES[(mode & 0x07) as usize]
}

/// User application names for FIG 0/13 (TS 101 756 table 16).
pub fn user_application_name(user_app_type: u16) -> &'static str {
    match user_app_type {
        0x000 => "Reserved for future definition",
        0x001 => "Not used",
        0x002 => "MOT Slideshow",
        0x003 => "MOT Broadacst Web Site",
        0x004 => "TPEG",
        0x005 => "DGPS",
        0x006 => "TMC",
        0x007 => "EPG",
        0x008 => "DAB Java",
        0x44A => "Journaline",
        _ => "Reserved for future applications",
    }
}

/// Audio service component types for FIG 0/2.
pub fn ascty_type(ascty: u8) -> String {
    match ascty {
        0 => format!("MPEG Foreground sound ({ascty})"),
        1 => format!("MPEG Background sound ({ascty})"),
        2 => format!("Multi Channel sound ({ascty})"),
        63 => format!("AAC sound ({ascty})"),
        _ => format!("Unknown ASCTy ({ascty})"),
    }
}

/// FEC scheme names for FIG 0/14.
static FEC_SCHEMES: [&str; 4] = [
    "no FEC scheme applied",
    "FEC scheme applied according to ETSI EN 300 401 clause 5.3.5",
    "reserved for future definition",
    "reserved for future definition",
];

pub fn fec_scheme(scheme: u8) -> &'static str {
    FEC_SCHEMES[(scheme & 0x03) as usize]
}

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Renders a modified Julian date as "Www Mmm dd yyyy".
///
/// EN 62106 Annex G; valid between 1st March 1900 and 28th February 2100.
pub fn mjd_to_string(mjd: u32) -> String {
    let mjd = mjd as f64;

    let y = ((mjd - 15078.2) / 365.25) as i32;
    let m = ((mjd - 14956.1 - (y as f64 * 365.25).trunc()) / 30.6001) as i32;
    let day = mjd as i32 - 14956 - (y as f64 * 365.25) as i32 - (m as f64 * 30.6001) as i32;
    let k = if m == 14 || m == 15 { 1 } else { 0 };

    let year = y + k + 1900;
    let month = m - 1 - k * 12;
    let weekday = (((mjd as i32 + 2) % 7) + 1) % 7;

    if !(1..=12).contains(&month) || day < 1 {
        return format!("invalid MJD mday={day} mon={month} year={year}");
    }

    format!(
        "{} {} {:02} {}",
        WEEKDAYS[weekday as usize],
        MONTHS[(month - 1) as usize],
        day,
        year
    )
}

/// Renders a FIG 0/16 programme number: date and time of day, or one of
/// the special codes used when the date part is zero.
pub fn pnum_to_string(pnum: u16) -> String {
    let minute = (pnum & 0x003F) as u8;
    let hour = ((pnum >> 6) & 0x001F) as u8;
    let day = ((pnum >> 11) & 0x001F) as u8;

    if day != 0 {
        return format!("day of month={day} time={hour:02}:{minute:02}");
    }

    match (hour, minute) {
        (0, 0) => "Status code: no meaningful PNum is currently provided".to_owned(),
        (0, 1) => "Blank code: the current programme is not worth recording".to_owned(),
        (0, 2) => {
            "Interrupt code: the interrupt is unplanned (for example a traffic announcement)"
                .to_owned()
        }
        _ => "invalid value".to_owned(),
    }
}

#[test]
fn language_lookup() {
    assert_eq!(language_name(9), "English");
    assert_eq!(language_name(0x7F), "Amharic");
    assert_eq!(language_name(0x80), "invalid language code");
}

#[test]
fn mjd_rendering() {
    // 2016-01-01 was a Friday, MJD 57388
    assert_eq!(mjd_to_string(57388), "Fri Jan 01 2016");
    // 2000-02-29, MJD 51603
    assert_eq!(mjd_to_string(51603), "Tue Feb 29 2000");
}

#[test]
fn pnum_rendering() {
    assert_eq!(pnum_to_string(0), "Status code: no meaningful PNum is currently provided");
    // day 12, 18:05
    let pnum = (12 << 11) | (18 << 6) | 5;
    assert_eq!(pnum_to_string(pnum), "day of month=12 time=18:05");
}
