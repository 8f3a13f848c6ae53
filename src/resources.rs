//! Verification resource registry: single source of truth for the sources a
//! terminologist consults.
//!
//! Resources are partitioned into internal, Netflix and external categories and
//! exposed per direction in priority order. The registry is built once on
//! first access and never mutated.

use crate::direction::Direction;
use anyhow::{bail, Result};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceCategory {
    Internal,
    Netflix,
    External,
}

impl ResourceCategory {
    pub fn heading(&self) -> &'static str {
        match self {
            ResourceCategory::Internal => "Internal Data Verification",
            ResourceCategory::Netflix => "Netflix-Specific Resources",
            ResourceCategory::External => "External Data Verification",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceCategory::Internal => f.write_str("internal"),
            ResourceCategory::Netflix => f.write_str("netflix"),
            ResourceCategory::External => f.write_str("external"),
        }
    }
}

/// A single verification source.
#[derive(Debug, Clone)]
pub struct VerificationResource {
    /// Stable identifier (e.g. "teamwork", "nikl_romanization")
    pub key: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub description: Option<&'static str>,
    /// File name of an offline copy inside the data directory
    pub local_file: Option<&'static str>,
    pub category: ResourceCategory,
}

/// Local reference files that are not tied to a single online resource
const STANDALONE_LOCAL_FILES: &[(&str, &str)] = &[
    (
        "manual",
        "CF Terminology Management Manual_en excerpts (translated by ChatGPT).txt",
    ),
    ("links", "terminologists_manual_links.txt"),
    ("task_tracker", "Task Tracker.xlsx"),
];

const KO_EN_PRIORITY: &[&str] = &[
    // Internal data verification
    "teamwork",
    "terminology_depository",
    "tm_depository",
    "lucid_tm",
    // Netflix resources
    "noc",
    "mmt",
    "ratings_trackers",
    "lrt",
    "lego",
    // External verification
    "nikl_romanization",
    "kofic_kobiz",
    "romanization_converter",
    "kmdb",
    "youtube",
    "imdb",
];

const EN_KO_PRIORITY: &[&str] = &[
    // Internal data verification
    "teamwork",
    "terminology_depository",
    "tm_depository",
    "lucid_tm",
    // Netflix resources
    "tiloc",
    "noc",
    "mmt",
    "ratings_trackers",
    "nf_service",
    "lrt",
    // External verification
    "nikl",
    "nikl_examples",
    "kmrb",
    "cambridge_dictionary",
    "youtube",
    "imdb",
];

pub struct ResourceRegistry {
    resources: Vec<VerificationResource>,
}

static REGISTRY: OnceLock<ResourceRegistry> = OnceLock::new();

impl ResourceRegistry {
    pub fn get() -> &'static ResourceRegistry {
        REGISTRY.get_or_init(|| ResourceRegistry {
            resources: default_resources(),
        })
    }

    pub fn get_by_key(&self, key: &str) -> Option<&VerificationResource> {
        self.resources.iter().find(|r| r.key == key)
    }

    pub fn list_all(&self) -> Vec<&VerificationResource> {
        self.resources.iter().collect()
    }

    pub fn by_category(&self, category: ResourceCategory) -> Vec<&VerificationResource> {
        self.resources
            .iter()
            .filter(|r| r.category == category)
            .collect()
    }

    /// Category lookup by name ("internal", "netflix", "external", "all")
    pub fn by_category_name(&self, name: &str) -> Result<Vec<&VerificationResource>> {
        match name.to_lowercase().as_str() {
            "internal" => Ok(self.by_category(ResourceCategory::Internal)),
            "netflix" => Ok(self.by_category(ResourceCategory::Netflix)),
            "external" => Ok(self.by_category(ResourceCategory::External)),
            "all" => Ok(self.list_all()),
            _ => bail!("Unknown resource category: {}", name),
        }
    }

    /// Resources to consult for a direction, highest priority first.
    pub fn for_direction(&self, direction: Direction) -> Vec<&VerificationResource> {
        let priorities = match direction {
            Direction::KoEn => KO_EN_PRIORITY,
            Direction::EnKo => EN_KO_PRIORITY,
        };
        priorities
            .iter()
            .filter_map(|key| self.get_by_key(key))
            .collect()
    }

    /// Which offline copies exist under `data_dir`, as (key, available) pairs.
    pub fn local_availability(&self, data_dir: &Path) -> Vec<(&'static str, bool)> {
        let from_resources = self
            .resources
            .iter()
            .filter_map(|r| r.local_file.map(|file| (r.key, file)));

        STANDALONE_LOCAL_FILES
            .iter()
            .copied()
            .chain(from_resources)
            .map(|(key, file)| (key, data_dir.join(file).exists()))
            .collect()
    }
}

/// Verification process text for a direction, grouped by category.
pub fn verification_process_text(direction: Direction) -> String {
    let resources = ResourceRegistry::get().for_direction(direction);

    let mut text = format!(
        "VERIFICATION PROCESS FOR {} TO {} NAMES:\n",
        direction.source_language().to_uppercase(),
        direction.target_language().to_uppercase()
    );

    let categories = [
        ResourceCategory::Internal,
        ResourceCategory::Netflix,
        ResourceCategory::External,
    ];
    for (i, category) in categories.iter().enumerate() {
        text.push_str(&format!("\n{}. {}:\n", i + 1, category.heading()));
        for resource in resources.iter().filter(|r| r.category == *category) {
            text.push_str(&format!("   - {}: {}\n", resource.name, resource.url));
            if let Some(description) = resource.description {
                text.push_str(&format!("     ({})\n", description));
            }
        }
    }

    text
}

/// One-line-per-resource list used inside prompts
pub fn format_resources_text(resources: &[&VerificationResource]) -> String {
    if resources.is_empty() {
        return "No resources available.".to_string();
    }

    resources
        .iter()
        .map(|r| {
            let mut line = format!("- {}", r.name);
            if !r.url.is_empty() {
                line.push_str(&format!(" ({})", r.url));
            }
            if let Some(description) = r.description {
                line.push_str(&format!(": {}", description));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Console listing of local resource availability
pub fn local_resources_text(data_dir: &Path) -> String {
    let mut text = String::from("LOCAL RESOURCES AVAILABLE:\n==========================\n");
    for (key, available) in ResourceRegistry::get().local_availability(data_dir) {
        let status = if available { "✓ Available" } else { "✗ Not found" };
        text.push_str(&format!("{}: {}\n", title_case(key), status));
    }
    text.push_str(&format!(
        "\nThese local files can be used for offline verification when online resources are unavailable.\nLocal files are stored in: {}\n",
        data_dir.display()
    ));
    text
}

fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn resource(
    key: &'static str,
    name: &'static str,
    url: &'static str,
    description: &'static str,
    category: ResourceCategory,
) -> VerificationResource {
    VerificationResource {
        key,
        name,
        url,
        description: Some(description),
        local_file: None,
        category,
    }
}

fn default_resources() -> Vec<VerificationResource> {
    use ResourceCategory::*;

    let with_file = |mut r: VerificationResource, file: &'static str| {
        r.local_file = Some(file);
        r
    };

    vec![
        // Internal
        resource(
            "teamwork",
            "CF Teamwork",
            "https://cultureflipper.teamwork.com",
            "Check existing submissions in CF Teamwork (do not trust records before 2019)",
            Internal,
        ),
        with_file(
            resource(
                "terminology_depository",
                "CF Terminology Depository",
                "https://docs.google.com/spreadsheets/d/1bktPGup6cixITi35RBtgZY41pGqguu93m8noGXQ5ffk/edit#gid=670266495&range=AA38",
                "CF Terminology depository for name verification",
                Internal,
            ),
            "Terminologists' Depository.xlsx",
        ),
        with_file(
            resource(
                "tm_depository",
                "TM Depository",
                "https://docs.google.com/spreadsheets/d/1A8QpynPg5rNJR2MPkPeyw7WDf5x-NiZauU5b2mN6NE0/edit#gid=0",
                "Internal terminology management depository",
                Internal,
            ),
            "TM Training Landscape.xlsx",
        ),
        with_file(
            resource(
                "tm_job_organizer",
                "TM Job Organizer",
                "https://docs.google.com/spreadsheets/d/1Ld3NOzPPua_XcodniDn2UaMr_ln_aDITgvdf4YHXizI/edit#gid=1174152703",
                "Terminology job organization spreadsheet",
                Internal,
            ),
            "TM Job Organizer.xlsx",
        ),
        resource(
            "tm_cellar",
            "TM Cellar",
            "https://docs.google.com/spreadsheets/d/1z_DEkSTvmsgDMzWVUh2oZoBFVKQaGSKDpVw68vmHR3o/edit#gid=0",
            "Terminology archive spreadsheet",
            Internal,
        ),
        with_file(
            resource(
                "cf_master_marketing",
                "CF Master Marketing Translations",
                "https://docs.google.com/spreadsheets/d/1ipJ3nxd2HAd16RGK6tIZLq3oVMXy9N5OFMAIhbGNtZA/edit#gid=678337773",
                "CF Master Marketing Translations spreadsheet",
                Internal,
            ),
            "MAIN MARKETING TRANSLATIONS (MMT - Source of Truth).xlsx",
        ),
        resource(
            "cf_metadata",
            "CF Metadata – Container Word Translations",
            "https://docs.google.com/spreadsheets/d/1ipJ3nxd2HAd16RGK6tIZLq3oVMXy9N5OFMAIhbGNtZA/edit#gid=0",
            "CF Metadata: Container Word Translations",
            Internal,
        ),
        // Lucid TM is Netflix-hosted but consulted as part of the internal pass
        resource(
            "lucid_tm",
            "Lucid TM",
            "https://localization-lucid.netflix.com/translation/search/?targetLocales=ko",
            "NFLX Lucid TM Check for notation history",
            Internal,
        ),
        // Netflix
        resource(
            "tiloc",
            "NF Tiloc",
            "https://localization-lucid.netflix.com/titles/search?cl=1",
            "NF title localization resource",
            Netflix,
        ),
        resource(
            "lrt",
            "NF LRT",
            "https://lrt.netflix.net/",
            "Netflix Translation Resource Tool",
            Netflix,
        ),
        resource(
            "lego",
            "LEGO subtitle search page",
            "https://lego.netflix.com/#",
            "Netflix subtitle search resource",
            Netflix,
        ),
        resource(
            "nf_service",
            "NF Service Page",
            "https://www.netflix.com/browse",
            "Netflix streaming service",
            Netflix,
        ),
        resource(
            "noc",
            "NF Original Credits (NOC)",
            "https://docs.google.com/spreadsheets/d/1AxXZfMZGmGMryaH4waVMvKoYps59owtyuBuTI2T_8pQ/edit#gid=554552356",
            "Netflix Original Credits resource",
            Netflix,
        ),
        resource(
            "mmt",
            "NF Master Marketing Translations (MMT)",
            "https://docs.google.com/spreadsheets/d/1oNJQBbfTCGBeziKjYftn-J5JU2KHFU7_CThZryQ_llg/edit?ts=5c1a9b19#gid=0",
            "Netflix Master Marketing Translations",
            Netflix,
        ),
        resource(
            "ratings_trackers",
            "NF Korean Ratings Trackers",
            "https://docs.google.com/spreadsheets/d/1i7RFBjbHaqsLC4LZz50kdvp1bcWbO4eOILc1kml6Gcc/edit#gid=1190947542",
            "Netflix Korean ratings tracking spreadsheet",
            Netflix,
        ),
        resource(
            "cognito_form",
            "NF Cognito Form",
            "https://netflix.jotform.com/200236257901044",
            "Netflix error reporting form",
            Netflix,
        ),
        // External
        resource(
            "nikl",
            "NIKL (National Institute of Korean Language)",
            "https://kornorms.korean.go.kr/",
            "Official Korean language authority",
            External,
        ),
        resource(
            "nikl_examples",
            "NIKL Example Search",
            "https://kornorms.korean.go.kr//example/exampleList.do?regltn_code=0003",
            "Example Search on NIKL Korean Language Standards page",
            External,
        ),
        resource(
            "nikl_romanization",
            "NIKL Romanization Rules",
            "https://kornorms.korean.go.kr//regltn/regltnView.do?regltn_code=0004#a",
            "Official Korean Romanization Rules",
            External,
        ),
        resource(
            "romanization_converter",
            "Romanization Converter",
            "http://roman.cs.pusan.ac.kr/",
            "Tool for converting between Korean and romanized text",
            External,
        ),
        resource(
            "kofic_kobis",
            "KOFIC KOBIS",
            "https://www.kobis.or.kr/kobis/business/main/main.do",
            "Korean Film Council box office information system",
            External,
        ),
        resource(
            "kofic_kobiz",
            "KOFIC KoBiz",
            "http://www.koreanfilm.or.kr/eng/main/main.jsp",
            "Korean Film Council business portal",
            External,
        ),
        resource(
            "kmdb",
            "KMDb",
            "https://www.kmdb.or.kr/main",
            "Korean Movie Database",
            External,
        ),
        resource(
            "kmrb",
            "KMRB (Korea Media Rating Board)",
            "https://www.kmrb.or.kr/kor/Main.do",
            "Official Korean media rating authority",
            External,
        ),
        resource(
            "cambridge_dictionary",
            "Cambridge Dictionary",
            "https://dictionary.cambridge.org/dictionary/english/",
            "English language reference",
            External,
        ),
        resource(
            "playdb",
            "PlayDB",
            "http://www.playdb.co.kr/Index.asp",
            "Korean performing arts database",
            External,
        ),
        resource(
            "grac",
            "GRAC (Game Rating Committee)",
            "https://www.grac.or.kr/",
            "Game Rating and Administration Committee",
            External,
        ),
        resource(
            "national_library",
            "National Library of Korea",
            "https://www.nl.go.kr/",
            "National Library of Korea",
            External,
        ),
        resource(
            "imdb",
            "IMDb",
            "https://www.imdb.com/",
            "Internet Movie Database",
            External,
        ),
        resource(
            "youtube",
            "YouTube",
            "https://www.youtube.com/",
            "For pronunciation verification",
            External,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    // ==================== Registry Tests ====================

    #[test]
    fn test_registry_is_singleton() {
        let a = ResourceRegistry::get() as *const _;
        let b = ResourceRegistry::get() as *const _;
        assert_eq!(a, b);
    }

    #[test]
    fn test_keys_are_unique() {
        let all = ResourceRegistry::get().list_all();
        let keys: HashSet<_> = all.iter().map(|r| r.key).collect();
        assert_eq!(keys.len(), all.len());
    }

    #[test]
    fn test_every_priority_key_exists() {
        let registry = ResourceRegistry::get();
        for key in KO_EN_PRIORITY.iter().chain(EN_KO_PRIORITY) {
            assert!(registry.get_by_key(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_for_direction_order() {
        let registry = ResourceRegistry::get();

        let ko_en = registry.for_direction(Direction::KoEn);
        assert_eq!(ko_en.len(), KO_EN_PRIORITY.len());
        assert_eq!(ko_en[0].key, "teamwork");
        assert_eq!(ko_en.last().unwrap().key, "imdb");

        let en_ko = registry.for_direction(Direction::EnKo);
        assert_eq!(en_ko.len(), EN_KO_PRIORITY.len());
        assert_eq!(en_ko[4].key, "tiloc");
    }

    #[test]
    fn test_by_category_name() {
        let registry = ResourceRegistry::get();
        let netflix = registry.by_category_name("NETFLIX").unwrap();
        assert!(netflix.iter().all(|r| r.category == ResourceCategory::Netflix));
        assert_eq!(registry.by_category_name("all").unwrap().len(), registry.list_all().len());
        assert!(registry.by_category_name("bogus").is_err());
    }

    // ==================== Local Files ====================

    #[test]
    fn test_local_availability_detects_present_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("TM Job Organizer.xlsx"), b"").unwrap();

        let availability = ResourceRegistry::get().local_availability(temp.path());
        let lookup = |key: &str| availability.iter().find(|(k, _)| *k == key).map(|(_, a)| *a);

        assert_eq!(lookup("tm_job_organizer"), Some(true));
        assert_eq!(lookup("manual"), Some(false));

        let text = local_resources_text(temp.path());
        assert!(text.contains("Tm Job Organizer: ✓ Available"));
        assert!(text.contains("Manual: ✗ Not found"));
    }

    // ==================== Text Rendering ====================

    #[test]
    fn test_verification_process_text_sections() {
        let text = verification_process_text(Direction::KoEn);
        assert!(text.starts_with("VERIFICATION PROCESS FOR KOREAN TO ENGLISH NAMES:"));
        assert!(text.contains("1. Internal Data Verification:"));
        assert!(text.contains("2. Netflix-Specific Resources:"));
        assert!(text.contains("3. External Data Verification:"));
        assert!(text.contains("NIKL Romanization Rules"));
        assert!(!text.contains("Cambridge Dictionary"));

        let text = verification_process_text(Direction::EnKo);
        assert!(text.contains("ENGLISH TO KOREAN"));
        assert!(text.contains("Cambridge Dictionary"));
    }

    #[test]
    fn test_format_resources_text() {
        let registry = ResourceRegistry::get();
        let picked = vec![registry.get_by_key("imdb").unwrap()];
        assert_eq!(
            format_resources_text(&picked),
            "- IMDb (https://www.imdb.com/): Internet Movie Database"
        );
        assert_eq!(format_resources_text(&[]), "No resources available.");
    }
}
