//! Built-in task instructions for each run mode.
//!
//! Any of these can be replaced at run time with `--instruction-file`.

/// One course detail page in, one course object out.
pub const COURSE_CATALOG_INSTRUCTION: &str = r#"You are a data extraction assistant for a university course catalog.
Analyze the text of a single course entry and extract:
- "course_number": subject code and number, e.g. "ACCT 2013"
- "title": the course title
- "credits": the credit hours as written
- "description": the main descriptive paragraph, WITHOUT the prerequisite list
- "prerequisites": a plain string of the requirements, e.g. "ACCT 1001 or Instructor permission."

Use "N/A" for any value that is not present in the text.
Respond with a single JSON object with exactly these keys and nothing else."#;

/// Degree-requirements page in, array of rule objects out. `{major_code}` is
/// substituted before the call.
pub const DEGREE_REQUIREMENTS_INSTRUCTION: &str = r#"You are analyzing the degree requirements page for the major "{major_code}".
Identify every distinct requirement section (core courses, general education, electives, minors, concentrations).
Return a JSON array with one object per section:
{
  "MajorCode": "{major_code}",
  "RequirementType": "UPPER_SNAKE_CASE name, e.g. CORE, GENERAL_EDUCATION, ELECTIVES",
  "Courses": [{"Subject": "MATH", "CourseNumber": 1103}],
  "MinCredits": 12,
  "AllowedSubjects": ["CIS", "MATH"],
  "Restrictions": ["Must be 3000+ level"],
  "TotalCreditsRequired": 44
}

Rules:
- "MajorCode" and "RequirementType" are required; include the other keys only when the text supports them.
- "Courses" lists specific named courses. CourseNumber is an integer.
- "MinCredits", "AllowedSubjects" and "Restrictions" describe elective-style sections chosen by rule.
- "TotalCreditsRequired" is only for a section that states its own credit total.
- Ignore degree-wide totals, GPA policies, advising notes and introductory text.
- Respond with ONLY the JSON array."#;

/// Prerequisite string in, normalized requirement object out.
pub const PREREQUISITES_INSTRUCTION: &str = r#"You normalize course prerequisite strings for a university registrar.
Convert the input into a JSON object with these keys:
- "required_courses": array of {"course_code": "...", "minimum_grade": "..."}; use "N/A" when no grade is given
- "required_choices": array of {"choose_n": integer, "from_courses": [course objects as above]}
- "other_conditions": string for non-course requirements such as "Instructor permission."; "N/A" if none

Example input: ACCT 1001 or Instructor permission.
Example output:
{"required_courses": [], "required_choices": [{"choose_n": 1, "from_courses": [{"course_code": "ACCT 1001", "minimum_grade": "N/A"}]}], "other_conditions": "Instructor permission."}

Example input: BIOL 1014 and CHEM 1114
Example output:
{"required_courses": [{"course_code": "BIOL 1014", "minimum_grade": "N/A"}, {"course_code": "CHEM 1114", "minimum_grade": "N/A"}], "required_choices": [], "other_conditions": "N/A"}

Respond with a single JSON object and nothing else."#;

/// Fill the `{major_code}` placeholder.
pub fn degree_requirements_instruction(major_code: &str) -> String {
    DEGREE_REQUIREMENTS_INSTRUCTION.replace("{major_code}", major_code)
}
