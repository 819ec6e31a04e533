use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rule set selector handed to the rule engine, never interpreted here
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_context_size")]
    pub context_size: usize,

    /// Link prefixes treated as interlanguage links and removed.
    ///
    /// Hyphenated codes like `zh-min-nan` are intentionally missing, so such
    /// links come out as ordinary link text.
    #[serde(default = "default_interlanguage_codes")]
    pub interlanguage_codes: Vec<String>,

    #[serde(default = "default_media_namespaces")]
    pub media_namespaces: Vec<String>,

    #[serde(default = "default_category_namespaces")]
    pub category_namespaces: Vec<String>,

    /// Layout keywords dropped from file/image links
    #[serde(default = "default_media_options")]
    pub media_options: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_context_size() -> usize {
    25
}

fn default_interlanguage_codes() -> Vec<String> {
    [
        "af", "als", "am", "an", "ar", "ast", "az", "be", "bg", "bn", "br", "bs", "ca", "cs",
        "cy", "da", "de", "el", "en", "eo", "es", "et", "eu", "fa", "fi", "fr", "fy", "ga", "gl",
        "he", "hi", "hr", "hu", "hy", "id", "is", "it", "ja", "ka", "kk", "ko", "la", "lb", "lt",
        "lv", "mk", "ml", "ms", "nds", "nl", "nn", "no", "oc", "pl", "pt", "ro", "ru", "sh", "sk",
        "sl", "sq", "sr", "sv", "sw", "ta", "th", "tl", "tr", "uk", "ur", "uz", "vi", "war", "yi",
        "zh",
    ]
    .iter()
    .map(|code| code.to_string())
    .collect()
}

fn default_media_namespaces() -> Vec<String> {
    [
        "File", "Image", "Media", "Datei", "Bild", "Fitxer", "Imatge", "Fichier", "Archivo",
        "Imagen", "Ficheiro", "Imagem", "Immagine", "Bestand", "Afbeelding", "Plik",
        "Grafika", "Soubor", "Fil", "Tiedosto", "Файл", "Изображение",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

fn default_category_namespaces() -> Vec<String> {
    [
        "Category", "Kategorie", "Categoria", "Catégorie", "Categoría", "Categorie",
        "Kategoria", "Kategori", "Kategória", "Luokka", "Категория", "Категорія",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

fn default_media_options() -> Vec<String> {
    [
        // en
        "thumb", "thumbnail", "frame", "framed", "frameless", "border", "left", "right",
        "center", "centre", "none", "upright", "baseline", "middle", "sub", "super", "top",
        "text-top", "bottom", "text-bottom",
        // de
        "miniatur", "mini", "gerahmt", "rahmenlos", "rahmen", "links", "rechts", "zentriert",
        "ohne", "hochkant",
        // ca/es/fr/it/pt
        "miniatura", "miniaturadeimagen", "vignette", "esquerra", "dreta", "izquierda",
        "derecha", "gauche", "droite", "sinistra", "destra", "esquerda", "direita", "centro",
    ]
    .iter()
    .map(|option| option.to_string())
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: default_language(),
            context_size: default_context_size(),
            interlanguage_codes: default_interlanguage_codes(),
            media_namespaces: default_media_namespaces(),
            category_namespaces: default_category_namespaces(),
            media_options: default_media_options(),
        }
    }
}

impl Config {
    /// Load configuration with priority: explicit file > local config > global config > defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global_config = Self::from_file(&global_path)?;
                config = config.merge(global_config);
            }
        }

        let local_path = PathBuf::from(".wikicheck.toml");
        if local_path.exists() {
            let local_config = Self::from_file(&local_path)?;
            config = config.merge(local_config);
        }

        if let Some(path) = explicit {
            let explicit_config = Self::from_file(path)?;
            config = config.merge(explicit_config);
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn merge(mut self, other: Self) -> Self {
        // other's values override self's where they differ from defaults
        if other.language != default_language() {
            self.language = other.language;
        }
        if other.context_size != default_context_size() {
            self.context_size = other.context_size;
        }
        if other.interlanguage_codes != default_interlanguage_codes() {
            self.interlanguage_codes = other.interlanguage_codes;
        }
        if other.media_namespaces != default_media_namespaces() {
            self.media_namespaces = other.media_namespaces;
        }
        if other.category_namespaces != default_category_namespaces() {
            self.category_namespaces = other.category_namespaces;
        }
        if other.media_options != default_media_options() {
            self.media_options = other.media_options;
        }
        self
    }

    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "wikicheck").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
