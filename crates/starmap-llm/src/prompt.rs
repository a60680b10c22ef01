use starmap_core::Batch;
use std::fmt::Write;

/// Render the categorization prompt for one batch.
///
/// Each repository is listed on its own line with its language, description
/// and topics. The model is asked for a bare JSON object mapping category
/// names to arrays of full names.
pub fn build_prompt(batch: &Batch<'_>) -> String {
    let mut prompt = format!(
        "Group the following {} GitHub repositories into categories by what they do.\n\
         Use short, descriptive category names such as \"Web Frameworks\" or \"Machine Learning\".\n\
         Every repository must appear in exactly one category, spelled exactly as listed.\n\
         Respond with a JSON object whose keys are category names and whose values are \
         arrays of repository full names, for example:\n\
         {{\"Web Frameworks\": [\"owner/repo\"], \"Databases\": [\"owner/other\"]}}\n\n\
         Repositories:\n",
        batch.len()
    );

    for item in batch.items {
        let _ = write!(prompt, "- {}", item.full_name);
        if let Some(language) = &item.primary_language {
            let _ = write!(prompt, " [{}]", language);
        }
        if let Some(description) = &item.description {
            let _ = write!(prompt, ": {}", description);
        }
        if !item.topics.is_empty() {
            let _ = write!(prompt, " (topics: {})", item.topics.join(", "));
        }
        prompt.push('\n');
    }

    prompt
}
