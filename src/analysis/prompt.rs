//! Prompt assembly for dependency analysis requests.
//!
//! The prompt is deterministic: the same manifest set and Python version
//! always produce the same string, which keeps cached analyses comparable
//! across runs.

use crate::manifest::{DetectedVersion, ManifestFile};

/// System message sent with every analysis request.
pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are a Python dependency analysis expert. Always respond with valid JSON only, no additional text.";

/// Catalogue of dependency failure modes the model is asked to check.
///
/// Versions named here are anchor points for the model, not pins we
/// enforce ourselves.
const PATTERN_CATALOGUE: &str = r#"KNOWN PATTERNS TO DETECT:

1. **Missing Version Pins**: Packages listed without == or >= (e.g., "numpy" instead of "numpy==1.26.0")

2. **Python Version Compatibility**:
   - pandas < 1.5 incompatible with Python 3.11+
   - tensorflow 2.3 only works with Python 3.6-3.8
   - Django 2.2 incompatible with Python 3.10+
   - matplotlib 3.1.0 requires Python < 3.11
   - numpy < 1.22 incompatible with Python 3.11+
   - asyncio packages need Python >= 3.7
   - typing package only needed for Python 3.5-3.10

3. **CUDA Version Mismatches**:
   - torch 2.1.0 requires CUDA 12.1 (not 11.8)
   - torch 1.13.1+cu117 needs CUDA 11.7

4. **Breaking Upgrades**:
   - SQLAlchemy 2.0 breaks Flask-SQLAlchemy < 3.0
   - Pydantic 2.0 breaks FastAPI < 0.100
   - jinja2 2.x incompatible with Flask 2.2+

5. **Conflicting Versions**:
   - scipy 1.5.x incompatible with numpy 1.26.x
   - protobuf 4.x breaks tensorflow 2.4 (needs 3.20.x)

6. **Deprecated Packages**: sklearn (use scikit-learn instead)

7. **Missing Common Dependencies**: Code likely importing requests or pytest without declaring them

8. **Duplicate Packages**: Same package listed more than once, possibly with different versions

9. **Platform-Specific Issues**:
   - CuPy wheels unavailable on Windows
   - faiss-cpu < 1.7.4 needs local compilers

10. **Indirect Dependency Conflicts**: transformers 4.33+ needs tokenizers 0.14+

11. **Wrong Build Types**: torch+cu118 builds on CPU-only machines

12. **Typos**: numpi instead of numpy

13. **Multi-Format Issues**: Poetry dev-dependencies missing from exports, Pipfile diverging from Pipfile.lock, setup.py install_requires out of sync"#;

const FEW_SHOT_EXAMPLES: &str = r#"FEW-SHOT EXAMPLES:

Example 1:
Input: numpy
pandas==1.3.0
Output Issue: {"title": "Missing version pin", "package": "numpy", "severity": "high", "category": "missing_pin", "description": "numpy has no version specified"}
Output Suggestion: "Pin numpy to a specific version: numpy==1.26.0"

Example 2:
Input: pandas==1.2.4 (with Python 3.11)
Output Issue: {"title": "Python compatibility issue", "package": "pandas", "severity": "high", "category": "conflict", "description": "pandas 1.2.4 is incompatible with Python 3.11"}

Example 3:
Input: numpy==1.26.0
scipy==1.5.4
Output Issue: {"title": "Version conflict", "package": "scipy", "severity": "high", "category": "conflict", "description": "scipy 1.5.4 requires numpy < 1.23"}

Example 4:
Input: sklearn==0.0
Output Issue: {"title": "Deprecated package name", "package": "sklearn", "severity": "medium", "category": "outdated", "description": "Use scikit-learn instead of sklearn"}"#;

const RESPONSE_CONTRACT: &str = r#"CRITICAL: Respond ONLY with a valid JSON object. No markdown, no explanatory text, raw JSON only.

Use this exact structure:
{
  "issues": [
    {
      "title": "short issue title",
      "package": "package name",
      "severity": "high|medium|low",
      "category": "missing_pin|conflict|outdated",
      "description": "one sentence explaining the problem"
    }
  ],
  "suggestions": ["actionable suggestion"],
  "dependencyDiff": [
    {
      "package": "package name",
      "before": "detected version or 'unversioned'",
      "after": "recommended version"
    }
  ]
}

CATEGORY RULES:
- "missing_pin": Package has no version specified
- "conflict": Package versions conflict with each other or with the Python version
- "outdated": Package has an old version that should be upgraded"#;

/// Builds the user prompt for one analysis request.
pub fn build_analysis_prompt(files: &[ManifestFile], version: &DetectedVersion) -> String {
    let file_list: Vec<String> = files
        .iter()
        .map(|f| format!("- {} ({})", f.name(), f.kind.label()))
        .collect();

    let version_note = if version.is_detected() {
        format!(
            "DETECTED PYTHON VERSION: {} (from {})\nIMPORTANT: Check all packages for compatibility with Python {}",
            version.version, version.source, version.version
        )
    } else {
        "NOTE: No Python version detected. Provide general compatibility warnings for common Python version issues.".to_string()
    };

    let file_contents: String = files
        .iter()
        .map(|f| format!("\n--- {} ({}) ---\n{}\n", f.name(), f.kind.label(), f.content))
        .collect();

    format!(
        r#"You are an expert Python dependency analyst. Analyze the following Python dependency file(s) using your knowledge of common dependency issues.

DETECTED FILES:
{}

{}

{}

{}

NOW ANALYZE THESE DEPENDENCY FILES:
{}
{}"#,
        file_list.join("\n"),
        version_note,
        PATTERN_CATALOGUE,
        FEW_SHOT_EXAMPLES,
        file_contents,
        RESPONSE_CONTRACT
    )
}
