//! Default rule tables for the sector and institution classifiers.

use super::KeywordRule;

pub const DEFAULT_SECTOR: &str = "Other";
pub const DEFAULT_INSTITUTION: &str = "Other Institutions";

pub const CANONICAL_SECTORS: &[&str] = &[
    "Technology",
    "Financials",
    "Healthcare",
    "Consumer Staples",
    "Consumer Discretionary",
    "Energy",
    "Materials",
    "Industrials",
    "Utilities",
    "Real Estate",
    "Communication Services",
    DEFAULT_SECTOR,
];

/// Provider sector labels → canonical sector.
pub const SECTOR_ALIASES: &[(&str, &str)] = &[
    ("Technology", "Technology"),
    ("Information Technology", "Technology"),
    ("Software", "Technology"),
    ("Hardware", "Technology"),
    ("Semiconductors", "Technology"),
    ("Internet", "Technology"),
    ("Financial Services", "Financials"),
    ("Financial", "Financials"),
    ("Financials", "Financials"),
    ("Banking", "Financials"),
    ("Insurance", "Financials"),
    ("Investment", "Financials"),
    ("Real Estate", "Real Estate"),
    ("Healthcare", "Healthcare"),
    ("Health Care", "Healthcare"),
    ("Pharmaceuticals", "Healthcare"),
    ("Medical", "Healthcare"),
    ("Biotechnology", "Healthcare"),
    ("Consumer Staples", "Consumer Staples"),
    ("Consumer Goods", "Consumer Staples"),
    ("Consumer Defensive", "Consumer Staples"),
    ("Food & Beverage", "Consumer Staples"),
    ("Beverages", "Consumer Staples"),
    ("Consumer Cyclical", "Consumer Discretionary"),
    ("Consumer Discretionary", "Consumer Discretionary"),
    ("Retail", "Consumer Discretionary"),
    ("Energy", "Energy"),
    ("Oil & Gas", "Energy"),
    ("Materials", "Materials"),
    ("Basic Materials", "Materials"),
    ("Mining", "Materials"),
    ("Chemicals", "Materials"),
    ("Industrials", "Industrials"),
    ("Transportation", "Industrials"),
    ("Aerospace", "Industrials"),
    ("Utilities", "Utilities"),
    ("Communication Services", "Communication Services"),
    ("Telecommunications", "Communication Services"),
    ("Media", "Communication Services"),
    ("Other", DEFAULT_SECTOR),
];

/// Exact issuer names as they appear on filings.
pub const SECTOR_NAME_TABLE: &[(&str, &str)] = &[
    ("APPLE INC", "Technology"),
    ("MICROSOFT CORP", "Technology"),
    ("AMAZON COM INC", "Technology"),
    ("ALPHABET INC", "Technology"),
    ("META PLATFORMS INC", "Technology"),
    ("TESLA INC", "Technology"),
    ("NVIDIA CORP", "Technology"),
    ("BANK OF AMERICA CORP", "Financials"),
    ("JPMORGAN CHASE & CO", "Financials"),
    ("WELLS FARGO & CO", "Financials"),
    ("AMERICAN EXPRESS CO", "Financials"),
    ("BERKSHIRE HATHAWAY INC", "Financials"),
    ("GOLDMAN SACHS GROUP INC", "Financials"),
    ("JOHNSON & JOHNSON", "Healthcare"),
    ("PFIZER INC", "Healthcare"),
    ("UNITEDHEALTH GROUP INC", "Healthcare"),
    ("ABBVIE INC", "Healthcare"),
    ("COCA COLA CO", "Consumer Staples"),
    ("PROCTER & GAMBLE CO", "Consumer Staples"),
    ("WALMART INC", "Consumer Staples"),
    ("PEPSICO INC", "Consumer Staples"),
    ("CHEVRON CORP", "Energy"),
    ("CHEVRON CORP NEW", "Energy"),
    ("EXXON MOBIL CORP", "Energy"),
    ("CONOCOPHILLIPS", "Energy"),
];

/// Ordered sector keyword rules. The first five carry the historic order
/// (banking before tech before health before energy before real estate);
/// the rest only catch names none of those match.
pub fn sector_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new("Financials", &["BANK", "FINANCIAL", "CREDIT"]),
        KeywordRule::new("Technology", &["TECH", "SOFTWARE", "COMPUTER"]),
        KeywordRule::new("Healthcare", &["PHARMA", "HEALTH", "MEDICAL"]),
        KeywordRule::new("Energy", &["OIL", "ENERGY", "PETROLEUM"]),
        KeywordRule::new("Real Estate", &["REAL ESTATE", "REIT"]),
        KeywordRule::new("Financials", &["INSURANCE"]),
        KeywordRule::new(
            "Communication Services",
            &["TELECOM", "COMMUNICATIONS", "WIRELESS"],
        ),
        KeywordRule::new("Consumer Staples", &["FOOD", "BEVERAGE"]),
        KeywordRule::new("Industrials", &["AEROSPACE", "INDUSTRIAL", "RAILROAD"]),
        KeywordRule::new("Materials", &["MINING", "CHEMICAL", "STEEL"]),
        KeywordRule::new("Utilities", &["UTILITIES", "UTILITY"]),
    ]
}

/// Ordered holder-category rules for institutional ownership.
pub fn institution_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            "Mutual Funds",
            &[
                "FUND",
                "MUTUAL",
                "FIDELITY",
                "VANGUARD",
                "INVESCO",
                "T. ROWE",
                "FRANKLIN",
                "AMERICAN FUNDS",
            ],
        ),
        KeywordRule::new("ETFs", &["ETF", "SPDR", "ISHARES", "STATE STREET"]),
        KeywordRule::new(
            "Investment Advisors",
            &["HEDGE", "CAPITAL", "PARTNERS", "MANAGEMENT"],
        ),
        KeywordRule::new(
            "Pension Funds",
            &["PENSION", "RETIREMENT", "CALPERS", "TEACHERS"],
        ),
        KeywordRule::new(
            "Insurance Companies",
            &["INSURANCE", "LIFE", "PRUDENTIAL", "METLIFE"],
        ),
    ]
}
