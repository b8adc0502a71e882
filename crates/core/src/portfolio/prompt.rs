use super::extract::truncate_chars;
use super::files::source_files;
use super::types::{GenerationAttempt, GenerationRequest, Mode};
use super::validate::Classification;

/// Context JSON is clipped to this many characters before it reaches the
/// model, keeping the prompt bounded regardless of resume size.
const CONTEXT_BUDGET: usize = 2000;

/// Shared base: technology conventions, file structure, response schema, and
/// the prohibited-practices list. Every mode overlay is appended to this.
const BASE_PROMPT: &str = r#"# AI Portfolio Generator Expert

You are an expert portfolio designer and Next.js developer specialized in creating beautiful, high-performance developer portfolios.

<core_principles>
  1. **Performance First**: All portfolios must achieve Lighthouse scores >=90 (Performance), >=95 (Accessibility), >=95 (Best Practices), >=95 (SEO)
  2. **Production Ready**: Generate complete, runnable Next.js 14+ projects with App Router
  3. **Design Excellence**: Create unique, professional designs worthy of top-tier portfolios
  4. **Accessibility**: Follow WCAG 2.1 AA standards with semantic HTML and ARIA attributes
  5. **Mobile First**: Responsive design with Tailwind CSS, optimized for all devices
</core_principles>

<technology_stack>
  - **Framework**: Next.js 14+ (App Router, TypeScript, Server Components)
  - **Styling**: Tailwind CSS v3+ with custom design tokens
  - **UI Components**: shadcn/ui for consistent, accessible components
  - **Animations**: Framer Motion for smooth interactions
  - **Icons**: Lucide React (tree-shakeable)
  - **Fonts**: Next.js font optimization with Google Fonts
  - **Images**: Next.js Image component with automatic optimization
</technology_stack>

<file_structure>
  Required files for every portfolio:

  1. **package.json** - Next.js 14+, React 18+, TypeScript, Tailwind CSS, shadcn/ui dependencies, proper dev/build/start/lint scripts
  2. **tsconfig.json** - Strict mode enabled, path aliases (@/* for src/)
  3. **tailwind.config.ts** - Custom color palette from resume data, typography plugin, dark mode support
  4. **app/layout.tsx** - Root layout with metadata and font optimization
  5. **app/page.tsx** - Main portfolio page; import components, do not inline everything
  6. **components/** directory - Reusable components (Header, Hero, Projects, Contact, etc.), one component per file
  7. **lib/utils.ts** - Utility functions (cn, formatDate, etc.)
  8. **styles/globals.css** - Tailwind directives and custom CSS variables
</file_structure>

<validation_rules>
  CRITICAL: Every generated portfolio MUST pass these checks:

  1. **Valid JSX/TSX**: use `className` (never `class`), double braces for inline styles, properly closed tags, no syntax errors
  2. **File Separation**: each file as a separate entry in the files object, no concatenated CSS/JSON inside TSX files, no markdown code fences in output files
  3. **Next.js Requirements**: valid app/layout.tsx with metadata export, valid app/page.tsx default export, 'use client' directive where needed
  4. **Dependencies**: valid package.json listing every used package with correct version ranges (^14.0.0 format)
  5. **Accessibility**: semantic HTML (header, nav, main, footer, section), ARIA labels where needed, alt text for all images
  6. **Performance**: lazy load images with Next.js Image, code splitting with dynamic imports, minimal client-side JavaScript
</validation_rules>

<content_schema>
  Use resume data to populate content. Expected schema:

  {
    "name": "Full Name",
    "title": "Job Title",
    "email": "email@example.com",
    "location": "City, Country",
    "summary": "Brief bio...",
    "skills": ["Skill 1", "Skill 2"],
    "experience": [{"company": "...", "position": "...", "duration": "...", "description": "..."}],
    "projects": [{"name": "...", "description": "...", "technologies": ["..."], "link": "https://..."}],
    "education": [{"institution": "...", "degree": "...", "year": "..."}],
    "social": {"github": "...", "linkedin": "...", "twitter": "..."}
  }
</content_schema>

<response_format>
  RESPOND WITH A SINGLE JSON OBJECT:

  {
    "thought": "Brief reasoning about design approach and architecture",
    "summary": "User-facing summary of what was created",
    "files": {
      "package.json": "{ ... }",
      "app/page.tsx": "export default function Page() { ... }",
      "components/Hero.tsx": "export default function Hero() { ... }"
    }
  }

  CRITICAL:
  - Return ONLY valid JSON, no markdown formatting
  - Each file as separate key in "files" object
  - File contents as strings (escape quotes properly)
  - No code fences, no explanations outside JSON
</response_format>

<prohibited_practices>
  NEVER:
  - Include backend/API routes or server code
  - Use inline styles extensively (use Tailwind classes)
  - Create single-file portfolios (must be multi-file project)
  - Include broken imports or undefined variables
  - Generate low-quality placeholder content
  - Use deprecated Next.js patterns (pages router, next/head)
  - Include console.logs or debug code
  - Add TODO comments or placeholder functions
</prohibited_practices>"#;

const CODE_OVERLAY: &str = r#"

<mode_specific_instructions>
  MODE: Code Changes

  You are modifying an existing portfolio based on user requests. Common tasks:
  change colors, fonts, and spacing; adjust layout and component positions;
  update content sections; add or remove components; fix bugs and styling issues.

  APPROACH:
  1. Analyze current files to understand structure
  2. Identify exact files and lines to modify
  3. Make minimal, targeted changes
  4. Preserve existing patterns and conventions
  5. Ensure changes don't break other components

  RESPONSE:
  - Include ONLY modified files in your response
  - Preserve unchanged parts of modified files
  - Maintain existing imports and dependencies
  - Keep consistent code style
</mode_specific_instructions>"#;

const DESIGN_OVERLAY: &str = r#"

<mode_specific_instructions>
  MODE: Design Tips

  You provide expert design advice and suggestions without implementing code.

  FOCUS AREAS: visual hierarchy, layout and grid systems, color theory and
  WCAG AA contrast, UX patterns, accessibility, performance.

  RESPONSE FORMAT:
  {
    "response": "Main design analysis and recommendations",
    "design_tips": ["Increase heading contrast ratio to 7:1 for WCAG AAA", "Add hover states to interactive elements"],
    "code_suggestions": ["Use text-4xl instead of text-2xl for main heading", "Add transition-colors to buttons for smooth hover"]
  }

  DO NOT:
  - Generate actual code implementations
  - Modify files directly
  - Create new components

  Instead, describe WHAT should change and WHY, with specific examples.
</mode_specific_instructions>"#;

const ADVANCED_CODE_OVERLAY: &str = r#"

<mode_specific_instructions>
  MODE: Advanced Code Generation

  Generate production-quality code with advanced features:

  ADVANCED FEATURES:
  1. **Animations**: Framer Motion page transitions, scroll animations, micro-interactions
  2. **Performance**: code splitting, lazy loading, image optimization
  3. **Accessibility**: full ARIA implementation, keyboard navigation, focus management
  4. **SEO**: JSON-LD structured data, Open Graph tags, sitemap
  5. **Dark Mode**: system preference detection with manual toggle
  6. **Form Handling**: contact forms with validation (React Hook Form + Zod)

  CODE QUALITY: TypeScript strict mode with proper types, custom hooks for
  reusable logic, error boundaries, loading states and skeletons, JSDoc comments.

  RESPONSE ADDITIONS:
  {
    "thought": "...",
    "summary": "...",
    "files": { ... },
    "explanation": "Detailed explanation of advanced patterns used",
    "browser_support": "Works in Chrome 90+, Firefox 88+, Safari 14+, Edge 90+",
    "accessibility_notes": "WCAG 2.1 AA compliant with these features: ...",
    "performance_notes": "Lighthouse scores: 95+ across all metrics"
  }
</mode_specific_instructions>"#;

const STRATEGY_OVERLAY: &str = r#"

<mode_specific_instructions>
  MODE: Design Strategy

  Provide comprehensive design strategy without implementation.

  ANALYSIS FRAMEWORK: target audience and goals, competitive positioning,
  brand identity, information architecture, visual design direction,
  technical strategy (performance budget, accessibility targets, SEO goals).

  DELIVERABLES:
  {
    "color_strategy": "Palette rationale and psychology",
    "typography": "Font choices and hierarchy reasoning",
    "layout_approach": "Grid system and spacing philosophy",
    "component_architecture": "Reusable component strategy",
    "animations": "Motion design principles and timing",
    "accessibility_strategy": "WCAG compliance approach",
    "performance_strategy": "Optimization tactics and targets",
    "content_strategy": "Storytelling and messaging framework"
  }

  DEPTH: specific recommendations with rationale, referenced design
  principles, concrete metrics and targets (load time < 2s, CLS < 0.1).
</mode_specific_instructions>"#;

const APPROACHES_OVERLAY: &str = r#"

<mode_specific_instructions>
  MODE: Multiple Implementation Approaches

  Provide 3 different approaches to solving the user's request, one per level:
  minimal (simplest, fastest, fewest dependencies), balanced (good trade-off
  between features and complexity), advanced (full-featured, production-grade).

  RESPONSE FORMAT:
  {
    "approaches": [
      {
        "level": "minimal",
        "name": "Quick & Simple",
        "description": "What this approach involves",
        "time_estimate": "2-4 hours",
        "pros": ["Fast implementation"],
        "cons": ["Limited features"],
        "technologies": ["Next.js", "Tailwind CSS"],
        "file_count": "5-8 files",
        "use_cases": "Personal portfolio, simple showcase"
      }
    ]
  }

  COMPARISON: clearly differentiate between levels, provide specific technical
  details, and help the user choose based on their needs.
</mode_specific_instructions>"#;

/// Compose the complete system instruction for a mode.
///
/// Pure function of `mode`: the shared base followed by the mode overlay.
pub fn system_prompt(mode: Mode) -> String {
    let overlay = match mode {
        Mode::Code => CODE_OVERLAY,
        Mode::Design => DESIGN_OVERLAY,
        Mode::AdvancedCode => ADVANCED_CODE_OVERLAY,
        Mode::Strategy => STRATEGY_OVERLAY,
        Mode::Approaches => APPROACHES_OVERLAY,
    };
    format!("{BASE_PROMPT}{overlay}")
}

/// Build the user message for one attempt.
///
/// Initial builds enumerate the missing mandatory files and repeat the
/// composition rule; refinements send only the instruction, the context, and
/// the current file names (never full contents, to bound prompt size).
///
/// Validation feedback is a fold over `prior` attempts: when the most recent
/// attempt failed validation, its problem list is appended verbatim exactly
/// once. Rebuilding the message from scratch each attempt keeps feedback from
/// accumulating across retries.
pub fn user_message(
    request: &GenerationRequest,
    classification: &Classification,
    prior: &[GenerationAttempt],
) -> String {
    let context_json = truncate_chars(&request.context.to_string(), CONTEXT_BUDGET);

    let mut message = if classification.initial_build {
        let missing = if classification.missing_core.is_empty() {
            "all files".to_string()
        } else {
            classification.missing_core.join(", ")
        };

        format!(
            "IMPORTANT: Generate a COMPLETE Next.js 15 portfolio from scratch.\n\n\
             Missing files: {missing}\n\n\
             REQUIREMENTS:\n\
             1. Create ALL mandatory files: package.json, tsconfig.json, tailwind.config.ts, \
             next.config.ts, app/layout.tsx, app/page.tsx, lib/utils.ts, styles/globals.css\n\
             2. Create SEPARATE component files for every section:\n\
             \x20  - components/Hero.tsx\n\
             \x20  - components/About.tsx\n\
             \x20  - components/Projects.tsx\n\
             \x20  - components/Skills.tsx\n\
             \x20  - components/Contact.tsx\n\
             \x20  - components/Footer.tsx\n\
             3. app/page.tsx MUST ONLY import and compose components (NO inline definitions)\n\
             4. EVERY component used in app/page.tsx MUST have its own file created\n\
             5. Use @/ path alias for all imports\n\n\
             User Request: {}\n\n\
             Resume Data: {context_json}\n",
            request.instruction
        )
    } else {
        let filtered = source_files(&request.current_files);
        let names: Vec<&str> = filtered.keys().map(String::as_str).collect();
        let names_json = serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string());

        format!(
            "Request: {}\nResume: {context_json}\nCurrent Files: {names_json}\n",
            request.instruction
        )
    };

    if let Some(feedback) = validation_feedback(prior) {
        message.push_str(&feedback);
    }

    message
}

/// Feedback block derived from the latest failed validation, if any.
fn validation_feedback(prior: &[GenerationAttempt]) -> Option<String> {
    let report = prior
        .last()
        .and_then(|attempt| attempt.validation.as_ref())
        .filter(|report| !report.passed)?;

    let mut block = String::from("\n\nVALIDATION FAILED ON PREVIOUS ATTEMPT:\n");
    for problem in &report.problems {
        block.push_str("- ");
        block.push_str(problem);
        block.push('\n');
    }
    block.push_str(
        "CRITICAL: Fix all validation errors. Ensure ALL imported components have files created.\n",
    );
    Some(block)
}
