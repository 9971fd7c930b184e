// Fixed instructions sent ahead of the page image and the job description,
// plus the user-facing messages of the analysis flow.

/// "Tell Me About the Resume": strengths and weaknesses narrative.
pub const EVALUATION_PROMPT: &str = "
You are an experienced Technical Human Resource Manager.
Review the resume against the job description and provide strengths and weaknesses.
";

/// "Get Keywords": structured skill extraction. The model is asked for JSON only.
pub const KEYWORDS_PROMPT: &str = r#"
As an expert ATS scanner, identify skills required from the job description.
Return JSON only in this format:
{ "Technical Skills": [], "Analytical Skills": [], "Soft Skills": [] }
"#;

/// "Percentage Match": score, missing keywords and closing remarks.
pub const PERCENTAGE_MATCH_PROMPT: &str = "
Evaluate the resume against the job description.
Return:
1) Percentage match
2) Missing keywords
3) Final thoughts
";

pub const QUOTA_WARNING: &str =
    "⚠️ Gemini API quota exceeded. Please wait a few seconds and try again.";

pub const SKILLS_FAILURE: &str = "Could not extract skills. Please try again.";

pub const JOB_DESCRIPTION_WARNING: &str = "Please enter a job description.";

pub const RESUME_WARNING: &str = "Please upload a resume.";
